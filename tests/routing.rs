use axum::body::to_bytes;
use axum::http::header::{ALLOW, CONTENT_TYPE};
use axum::http::Method;
use mantle::prelude::*;
use mantle::routing::DiscoveredRoute;
use tower::ServiceExt;
use tower_http::trace::TraceLayer;

mod support {
    use mantle::prelude::*;

    pub trait Clock: Send + Sync {
        fn now(&self) -> &'static str;
    }

    #[derive(Injectable)]
    pub struct FixedClock;

    impl Clock for FixedClock {
        fn now(&self) -> &'static str {
            "noon"
        }
    }

    #[derive(Injectable)]
    pub struct SomethingMiddleware;

    #[async_trait]
    impl Middleware for SomethingMiddleware {
        async fn process(&self, request: Request<Body>, next: Next) -> mantle::Result<Response> {
            let mut response = next.run(request).await?;
            response.headers_mut().insert(
                "x-something",
                axum::http::HeaderValue::from_static("Value"),
            );
            Ok(response)
        }
    }

    #[derive(Injectable)]
    pub struct Summer;

    #[async_trait]
    impl Invokable for Summer {
        type Output = String;

        async fn invoke(&self, args: Vec<String>) -> String {
            let sum: i64 = args.iter().filter_map(|arg| arg.parse::<i64>().ok()).sum();
            sum.to_string()
        }
    }
}

mod mask {
    pub mod home {
        use crate::support::{Clock, SomethingMiddleware};
        use mantle::prelude::*;
        use serde::Serialize;

        #[derive(Serialize)]
        pub struct Item {
            pub id: i64,
            pub source: &'static str,
        }

        #[controller]
        pub struct HomeController {
            clock: Arc<dyn Clock>,
        }

        #[routes]
        impl HomeController {
            #[uget("/")]
            #[uget("/item/{id}")]
            pub async fn index(&self, #[default(1)] id: i64) -> Json<Item> {
                Json(Item { id, source: "mask" })
            }

            #[get("/time", middleware = [SomethingMiddleware])]
            pub async fn time(&self) -> String {
                self.clock.now().to_string()
            }

            #[get("/users/me")]
            pub fn me() -> &'static str {
                "me"
            }

            #[get("/users/{id}")]
            pub fn user(id: String) -> String {
                format!("user {id}")
            }

            #[post("/things")]
            pub async fn create_thing(&self) {}

            #[delete("/things")]
            pub async fn delete_thing(&self) {}
        }
    }
}

mod app {
    pub mod home {
        use mantle::prelude::*;
        use serde::Serialize;

        #[derive(Serialize)]
        pub struct Item {
            pub id: i64,
            pub source: &'static str,
        }

        #[controller]
        pub struct HomeController;

        #[routes]
        impl HomeController {
            pub async fn index(&self, #[default(1)] id: i64) -> Json<Item> {
                Json(Item { id, source: "app" })
            }

            #[get("/appitem/{id}")]
            pub async fn app_item(&self, id: i64) -> String {
                format!("app item {id}")
            }
        }
    }
}

fn mask_tree() -> ControllerTree {
    ControllerTree::new("Mask\\Http", concat!(module_path!(), "::mask"))
        .controller::<mask::home::HomeController>()
}

fn app_tree() -> ControllerTree {
    ControllerTree::new("App\\Http", concat!(module_path!(), "::app"))
        .controller::<app::home::HomeController>()
}

struct ClockProvider;

impl ServiceProvider for ClockProvider {
    fn register(&self, app: &mut ApplicationBuilder) -> mantle::Result<()> {
        app.container_mut()
            .bind::<dyn support::Clock, support::FixedClock, _>(|clock| clock as Arc<dyn support::Clock>);
        Ok(())
    }

    fn boot(&self, app: &mut ApplicationBuilder) -> mantle::Result<()> {
        app.router_mut()
            .get("/sum/{a}/{b}", Action::invokable::<support::Summer>())?;
        Ok(())
    }
}

fn application(with_override: bool) -> Application {
    let mut web = WebServiceProvider::new(mask_tree());
    if with_override {
        web = web.with_override(app_tree());
    }
    Application::builder(AppConfig::default())
        .unwrap()
        .provider(ClockProvider)
        .provider(web)
        .build()
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn route<'a>(routes: &'a [DiscoveredRoute], path: &str) -> &'a DiscoveredRoute {
    routes.iter().find(|route| route.path == path).unwrap()
}

#[test]
fn test_discovery_binds_unmasked_routes_to_override() {
    let discovery = RouteDiscovery::new(mask_tree()).with_override(app_tree());
    let routes: Vec<_> = discovery.discover().collect();

    assert_eq!(route(&routes, "/").class, "App\\Http\\Home\\HomeController");
    assert_eq!(route(&routes, "/item/{id}").class, "App\\Http\\Home\\HomeController");
    assert_eq!(route(&routes, "/time").class, "Mask\\Http\\Home\\HomeController");
    assert_eq!(route(&routes, "/appitem/{id}").class, "App\\Http\\Home\\HomeController");
    assert_eq!(route(&routes, "/").action.method_name(), Some("index"));
}

#[test]
fn test_discovery_without_override_keeps_base_classes() {
    let routes: Vec<_> = RouteDiscovery::new(mask_tree()).discover().collect();

    assert!(routes
        .iter()
        .all(|route| route.class == "Mask\\Http\\Home\\HomeController"));
    assert!(routes.iter().all(|route| route.path != "/appitem/{id}"));
}

#[test]
fn test_each_route_attribute_yields_a_record() {
    let routes: Vec<_> = RouteDiscovery::new(mask_tree()).discover().collect();
    let index: Vec<_> = routes
        .iter()
        .filter(|route| route.action.method_name() == Some("index"))
        .map(|route| route.path)
        .collect();

    assert_eq!(index, vec!["/", "/item/{id}"]);
    assert_eq!(route(&routes, "/time").middleware.len(), 1);
}

#[tokio::test]
async fn test_override_serves_json_with_default_parameter() {
    let app = application(true);
    let response = app.handle(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[CONTENT_TYPE],
        "application/json;charset=utf-8"
    );
    assert_eq!(body_text(response).await, r#"{"id":1,"source":"app"}"#);
}

#[tokio::test]
async fn test_base_controller_serves_without_override() {
    let app = application(false);
    let response = app.handle(get("/item/7")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, r#"{"id":7,"source":"mask"}"#);
}

#[tokio::test]
async fn test_unparsable_path_parameter_is_bad_request() {
    let app = application(true);
    let response = app.handle(get("/item/abc")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let app = application(true);
    let response = app.handle(get("/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wrong_method_lists_allowed_methods() {
    let app = application(true);
    let response = app.handle(get("/things")).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()[ALLOW], "POST, DELETE");

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/things")
        .body(Body::empty())
        .unwrap();
    let response = app.handle(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "");
}

#[tokio::test]
async fn test_route_middleware_and_bound_service() {
    let app = application(true);
    let response = app.handle(get("/time")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-something"], "Value");
    assert_eq!(body_text(response).await, r#""noon""#);

    let response = app.handle(get("/")).await.unwrap();
    assert!(response.headers().get("x-something").is_none());
}

#[tokio::test]
async fn test_first_registered_route_wins() {
    let app = application(true);

    let response = app.handle(get("/users/me")).await.unwrap();
    assert_eq!(body_text(response).await, r#""me""#);

    let response = app.handle(get("/users/42")).await.unwrap();
    assert_eq!(body_text(response).await, r#""user 42""#);
}

#[tokio::test]
async fn test_invokable_receives_positional_parameters() {
    let app = application(true);
    let response = app.handle(get("/sum/2/40")).await.unwrap();
    assert_eq!(body_text(response).await, r#""42""#);
}

#[tokio::test]
async fn test_axum_service_behind_trace_layer() {
    let app = application(true);
    let service = app.into_axum().layer(TraceLayer::new_for_http());

    let response = service.clone().oneshot(get("/appitem/5")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, r#""app item 5""#);

    let response = service.oneshot(get("/nowhere")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
