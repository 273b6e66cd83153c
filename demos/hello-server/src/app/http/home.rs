use crate::greeting::Greeter;
use mantle::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct AppItem {
    pub id: i64,
    pub source: &'static str,
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AppItemQuery {
    pub q: Option<String>,
}

/// Takes over `/` from the mask controller of the same name.
#[controller]
pub struct HomeController {
    greeter: Arc<dyn Greeter>,
}

#[routes]
impl HomeController {
    pub async fn index(&self) -> String {
        self.greeter.greet("app")
    }

    #[get("/appitem/{id}")]
    pub async fn app_item(&self, id: i64, request: ServerRequest) -> mantle::Result<Json<AppItem>> {
        let query: AppItemQuery = request.query()?;
        Ok(Json(AppItem {
            id,
            source: "app",
            query: query.q,
        }))
    }
}
