mod options_test;
mod search_test;
