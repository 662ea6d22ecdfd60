mod cursor_test;
