pub mod router_health_route;
pub mod router_ingest_route;
pub mod router_query_route;
