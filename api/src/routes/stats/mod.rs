pub mod stats_route;
