mod model_test;
mod persistence_test;
