mod helpers;
mod process_test;
mod router_test;
