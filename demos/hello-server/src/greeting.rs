use mantle::prelude::*;

pub trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

#[derive(Injectable)]
pub struct PlainGreeter {
    config: Arc<AppConfig>,
}

impl Greeter for PlainGreeter {
    fn greet(&self, name: &str) -> String {
        format!("Hello, {name}! (served on port {})", self.config.port)
    }
}

/// Binds the greeter used by every controller.
pub struct GreetingProvider;

impl ServiceProvider for GreetingProvider {
    fn register(&self, app: &mut ApplicationBuilder) -> mantle::Result<()> {
        app.container_mut()
            .bind::<dyn Greeter, PlainGreeter, _>(|greeter| greeter as Arc<dyn Greeter>);
        Ok(())
    }

    fn boot(&self, app: &mut ApplicationBuilder) -> mantle::Result<()> {
        app.logger()
            .channel("greeting")?
            .info("Greeter bound to PlainGreeter");
        Ok(())
    }
}
