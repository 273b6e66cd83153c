use mantle::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct NewGreeting {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct Greeting {
    pub message: String,
}

#[controller]
pub struct HelloWorldController;

#[routes]
impl HelloWorldController {
    #[get("/hello/{name}")]
    pub fn hello(name: String) -> String {
        format!("Hello, {name}!")
    }

    #[post("/hello")]
    pub async fn create(request: ServerRequest) -> mantle::Result<Json<Greeting>> {
        let body: NewGreeting = request.json()?;
        if body.name.is_empty() {
            return Err(HttpException::BadRequest.into());
        }
        Ok(Json(Greeting {
            message: format!("Hello, {}!", body.name),
        }))
    }
}
