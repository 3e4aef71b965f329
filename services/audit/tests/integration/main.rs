mod helpers;
mod record_test;
mod router_test;
