mod default_store_test;
mod odm_test;
