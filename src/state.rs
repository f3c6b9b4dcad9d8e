use crate::config::Config;
use crate::db::Store;
use std::sync::Arc;
use tera::Tera;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<Config>,
    pub templates: Arc<Tera>,
}
