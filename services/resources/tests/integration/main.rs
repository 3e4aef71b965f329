mod helpers;
mod resource_test;
mod router_test;
