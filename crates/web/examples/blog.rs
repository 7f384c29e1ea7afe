use micro_coroweb::middleware::standard_stages;
use micro_coroweb::signature::Param;
use micro_coroweb::{ApiError, AppConfig, Kwargs, Normalizer, Reply, Router, Server, Templates, handler_fn};
use serde_json::{Map, Value, json};
use std::sync::{Arc, Mutex};

type Blogs = Arc<Mutex<Vec<Value>>>;

// curl -v http://127.0.0.1:9000/
async fn index(_kwargs: Kwargs) -> Result<Reply, ApiError> {
    let mut context = Map::new();
    context.insert("title".into(), json!("micro-coroweb"));
    Ok(Reply::template("index.html", context))
}

// curl -v http://127.0.0.1:9000/blog/1
async fn get_blog(blogs: Blogs, kwargs: Kwargs) -> Result<Value, ApiError> {
    let id = kwargs.parse::<usize>("id")?.unwrap_or_default();
    let blogs = blogs.lock().map_err(|_| ApiError::new("internal", "", "blogs unavailable"))?;
    blogs.get(id).cloned().ok_or_else(|| ApiError::not_found("id", format!("no blog {id}")))
}

// curl -v 'http://127.0.0.1:9000/api/blogs?page=1'
async fn api_blogs(blogs: Blogs, kwargs: Kwargs) -> Result<Value, ApiError> {
    let page = kwargs.parse::<usize>("page")?.unwrap_or(1);
    let blogs = blogs.lock().map_err(|_| ApiError::new("internal", "", "blogs unavailable"))?;
    Ok(json!({ "page": page, "blogs": *blogs }))
}

// curl -v -H 'Content-Type: application/json' -d '{"name":"hello","summary":"world"}' http://127.0.0.1:9000/api/blogs
// curl -v -d 'name=hello&summary=world' http://127.0.0.1:9000/api/blogs
async fn api_create_blog(blogs: Blogs, kwargs: Kwargs) -> Result<Reply, ApiError> {
    let name = kwargs.get_str("name").filter(|name| !name.trim().is_empty());
    let name = name.ok_or_else(|| ApiError::invalid_value("name", "name cannot be empty"))?;
    let summary = kwargs.get_str("summary").unwrap_or_default();

    let mut blogs = blogs.lock().map_err(|_| ApiError::new("internal", "", "blogs unavailable"))?;
    blogs.push(json!({ "name": name, "summary": summary }));
    Ok(Reply::redirect(format!("/blog/{}", blogs.len() - 1)))
}

// curl -v http://127.0.0.1:9000/signout
async fn signout(_kwargs: Kwargs) -> Result<Reply, ApiError> {
    Ok(Reply::redirect("/"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load_from("app")?;
    let blogs: Blogs = Arc::default();

    let blog_handler = {
        let blogs = Arc::clone(&blogs);
        move |kwargs| get_blog(Arc::clone(&blogs), kwargs)
    };
    let list_handler = {
        let blogs = Arc::clone(&blogs);
        move |kwargs| api_blogs(Arc::clone(&blogs), kwargs)
    };
    let create_handler = move |kwargs| api_create_blog(Arc::clone(&blogs), kwargs);

    let normalizer = Normalizer::with_templates(Templates::from_config(&config.templates));

    let router = Router::builder()
        .add_routes([
            handler_fn("index", index).get("/"),
            handler_fn("get_blog", blog_handler).get("/blog/{id}").param(Param::positional("id")),
            handler_fn("api_blogs", list_handler).get("/api/blogs").param(Param::keyword("page").with_default()),
            handler_fn("api_create_blog", create_handler).post("/api/blogs").params([
                Param::request(),
                Param::keyword("name"),
                Param::keyword("summary").with_default(),
            ]),
            handler_fn("signout", signout).get("/signout"),
        ])?
        .mount_static(&config.static_files.prefix, &config.static_files.dir)?
        .with_global_decorator(standard_stages(normalizer.clone()))
        .build()?;

    let server = Server::builder().router(router).config(&config).normalizer(normalizer).build()?;
    server.start().await?;
    Ok(())
}
