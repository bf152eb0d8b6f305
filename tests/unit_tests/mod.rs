mod prolongation;
