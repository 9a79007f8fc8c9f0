pub mod health_request;
pub mod health_route;
