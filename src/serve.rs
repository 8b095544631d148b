//! HTTP server for interactive mode
//!
//! `glucoaster serve --data-dir ./data` → starts server, opens browser, answers
//! the chart layer's queries as JSON.
//!
//! Every request loads the character table afresh; nothing is kept between
//! requests.

use crate::catalog;
use crate::character::Character;
use crate::error::{Error, Result};
use crate::glucose::{self, resolve_time, DayWindow, TimeRange, TimeScale};
use crate::loader::{CsvDirLoader, TableLoader};
use crate::nutrients::{BaselineSet, Baselines};
use crate::report::MealReport;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use tiny_http::{Header, Method, Request, Response, Server};

const INDEX: &str = "\
Glucoaster API

GET /api/characters
GET /api/meals?character=jack
GET /api/meal?character=jack&meal=Dinner[&baselines=nih|meal-target][&evening=true]
GET /api/nearest?character=jack&meal=Dinner&at=18:20[&evening=true]
GET /api/aggregate?character=jack&meal=Dinner&from=18:00&to=20:00[&evening=true]
GET /api/brush?character=jack&meal=Dinner&x0=120&x1=300&width=600[&evening=true]
";

#[derive(Serialize)]
struct ApiResponse<T> {
    ok: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self { ok: true, data: Some(data), error: None }
    }
}

impl ApiResponse<()> {
    fn failure(error: String) -> Self {
        Self { ok: false, data: None, error: Some(error) }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct QueryParams {
    pub character: Option<String>,
    pub meal: Option<String>,
    pub baselines: Option<String>,
    #[serde(default)]
    pub evening: bool,
    pub at: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub x0: Option<f64>,
    pub x1: Option<f64>,
    pub width: Option<f64>,
}

impl QueryParams {
    fn character(&self) -> Result<Character> {
        self.character
            .as_deref()
            .ok_or_else(|| Error::BadRequest("missing character".to_string()))?
            .parse()
    }

    fn meal(&self) -> Result<&str> {
        self.meal
            .as_deref()
            .ok_or_else(|| Error::BadRequest("missing meal".to_string()))
    }

    fn number(value: Option<f64>, name: &str) -> Result<f64> {
        value.ok_or_else(|| Error::BadRequest(format!("missing {}", name)))
    }

    fn range(&self) -> Option<TimeRange> {
        self.evening.then(TimeRange::evening)
    }
}

/// What the handlers need: where tables come from and the default baselines
pub struct ServeContext {
    loader: Box<dyn TableLoader>,
    baselines: BaselineSet,
}

impl ServeContext {
    pub fn new(loader: Box<dyn TableLoader>, baselines: BaselineSet) -> Self {
        Self { loader, baselines }
    }

    fn baselines(&self, params: &QueryParams) -> Result<Baselines> {
        match params.baselines.as_deref() {
            Some(name) => Ok(name.parse::<BaselineSet>()?.baselines()),
            None => Ok(self.baselines.baselines()),
        }
    }
}

/// Start server, open browser, serve the API
pub fn start(port: u16, data_dir: PathBuf, baselines: BaselineSet) -> std::io::Result<()> {
    let addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&addr).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    let url = format!("http://localhost:{}", port);
    let dir_str = data_dir.canonicalize().unwrap_or(data_dir.clone()).display().to_string();

    eprintln!("\n\x1b[1;32m🎢 Glucoaster\x1b[0m");
    eprintln!("   {}", url);
    eprintln!("   Tables: {}  Baselines: {}\n", dir_str, baselines);

    // Open browser
    if let Err(e) = open::that(&url) {
        log::debug!("could not open browser: {}", e);
    }

    let ctx = ServeContext::new(Box::new(CsvDirLoader::new(&data_dir)), baselines);

    // Handle requests
    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &ctx) {
            log::error!("request failed: {}", e);
        }
    }

    Ok(())
}

fn handle_request(request: Request, ctx: &ServeContext) -> std::io::Result<()> {
    let url = request.url().to_string();
    let mut parts = url.splitn(2, '?');
    let path = parts.next().unwrap_or("/");
    let query = parts.next().unwrap_or("");

    if request.method() != &Method::Get {
        return respond_json(request, 405, &ApiResponse::failure("method not allowed".to_string()));
    }
    if path == "/" {
        let response = with_content_type(Response::from_string(INDEX), "text/plain; charset=utf-8");
        return request.respond(response);
    }

    log::info!("→ {}", url);
    match dispatch(path, query, ctx) {
        Ok(Some(data)) => respond_json(request, 200, &ApiResponse::success(data)),
        Ok(None) => respond_json(request, 404, &ApiResponse::failure(format!("no route for {}", path))),
        Err(e) => {
            log::warn!("{}: {}", path, e);
            respond_json(request, 400, &ApiResponse::failure(e.to_string()))
        }
    }
}

fn respond_json<T: Serialize>(request: Request, status: u16, body: &ApiResponse<T>) -> std::io::Result<()> {
    let json = serde_json::to_string(body)?;
    let response = with_content_type(
        Response::from_string(json).with_status_code(status),
        "application/json",
    );
    request.respond(response)
}

fn with_content_type<R: std::io::Read>(response: Response<R>, value: &str) -> Response<R> {
    match Header::from_bytes(&b"Content-Type"[..], value.as_bytes()) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

/// Route an API call. `Ok(None)` means the path is unknown.
pub fn dispatch(path: &str, query: &str, ctx: &ServeContext) -> Result<Option<Value>> {
    let params: QueryParams = serde_urlencoded::from_str(query)
        .map_err(|e| Error::BadRequest(format!("bad query string: {}", e)))?;

    let value = match path {
        "/api/characters" => json!(Character::ALL
            .iter()
            .map(|c| json!({ "id": c, "name": c.name(), "table": c.table_file() }))
            .collect::<Vec<_>>()),

        "/api/meals" => {
            let character = params.character()?;
            let table = ctx.loader.load(character)?;
            let meals: Vec<Value> = catalog::distinct_meals(&table)
                .iter()
                .map(|m| {
                    json!({
                        "id": m,
                        "display_name": catalog::display_name(m),
                        "image": catalog::image_file_name(m),
                    })
                })
                .collect();
            json!({ "character": character, "meals": meals })
        }

        "/api/meal" => {
            let character = params.character()?;
            let table = ctx.loader.load(character)?;
            let report = MealReport::build(
                character,
                &table,
                params.meal()?,
                &ctx.baselines(&params)?,
                params.range(),
            )?;
            serde_json::to_value(report)?
        }

        "/api/nearest" => {
            let window = load_window(ctx, &params)?;
            let at = params
                .at
                .as_deref()
                .ok_or_else(|| Error::BadRequest("missing at".to_string()))?;
            let query = resolve_time(window.date, at)?;
            let sample = glucose::nearest(&window, query)?;
            json!({ "query": query, "sample": sample })
        }

        "/api/aggregate" => {
            let window = load_window(ctx, &params)?;
            let from = params.from.as_deref().unwrap_or("00:00");
            let to = params.to.as_deref().unwrap_or("23:59:59.999");
            let stats = glucose::aggregate(
                &window,
                resolve_time(window.date, from)?,
                resolve_time(window.date, to)?,
            );
            json!({ "stats": stats })
        }

        "/api/brush" => {
            let window = load_window(ctx, &params)?;
            let width = QueryParams::number(params.width, "width")?;
            let x0 = QueryParams::number(params.x0, "x0")?;
            let x1 = QueryParams::number(params.x1, "x1")?;
            let stats = TimeScale::new(&window, width)
                .and_then(|scale| glucose::aggregate_span(&window, &scale, x0, x1));
            json!({ "stats": stats })
        }

        _ => return Ok(None),
    };

    Ok(Some(value))
}

fn load_window(ctx: &ServeContext, params: &QueryParams) -> Result<DayWindow> {
    let table = ctx.loader.load(params.character()?)?;
    let meal = params.meal()?;
    let record = catalog::find_meal(&table, meal).ok_or_else(|| Error::UnknownMeal(meal.to_string()))?;
    let reference = record
        .timestamp
        .ok_or_else(|| Error::MissingTimestamp(meal.to_string()))?;
    Ok(glucose::select_day(&table, reference, params.range()))
}
