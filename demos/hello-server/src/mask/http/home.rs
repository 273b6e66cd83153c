use crate::greeting::Greeter;
use crate::middleware::SomethingMiddleware;
use mantle::prelude::*;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
}

#[controller]
pub struct HomeController {
    greeter: Arc<dyn Greeter>,
}

#[routes]
impl HomeController {
    #[uget("/")]
    pub async fn index(&self) -> String {
        self.greeter.greet("mask")
    }

    #[uget("/item")]
    #[uget("/item/{id}", middleware = [SomethingMiddleware])]
    pub async fn item(&self, #[default(1)] id: i64) -> Json<Item> {
        Json(Item {
            id,
            name: format!("mask item {id}"),
        })
    }
}
