use mantle::logging::init_tracing;
use mantle::prelude::*;

mod app;
mod greeting;
mod mask;
mod middleware;

use greeting::GreetingProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    init_tracing(&config)?;

    tracing::info!("🚀 Starting hello-server...");

    // Base controllers; unmasked routes here may be taken over by `app`.
    let mask = ControllerTree::new("Mask\\Http", concat!(module_path!(), "::mask::http"))
        .controller::<mask::http::home::HomeController>()
        .controller::<mask::http::hello_world::HelloWorldController>();

    let app = ControllerTree::new("App\\Http", concat!(module_path!(), "::app::http"))
        .controller::<app::http::home::HomeController>();

    Application::builder(config)?
        .provider(GreetingProvider)
        .provider(WebServiceProvider::new(mask).with_override(app))
        .build()?
        .serve()
        .await?;

    Ok(())
}
