mod api;
mod health;
mod redirect;

pub use api::{shorten_handler, stats_handler, top_links_handler};
pub use health::health_handler;
pub use redirect::redirect_handler;
