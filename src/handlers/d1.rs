//! D1 (relational database) handler.

use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::bindings::d1::{Database, Statement};
use crate::bindings::Module;
use crate::codec::{Envelope, Params, Value};
use crate::routing::DispatchError;

/// `[query, bindings]` at the head of the parameter list.
fn statement(params: &mut Params) -> Result<Statement, DispatchError> {
    let query: String = params.take(0)?;
    let bindings: Option<Vec<Value>> = params.take(1)?;
    Ok(Statement {
        query,
        bindings: bindings.unwrap_or_default(),
    })
}

pub async fn handle(db: &dyn Database, envelope: Envelope) -> Result<Response, DispatchError> {
    let (operation, mut params) = envelope.into_parts();
    match operation.as_deref() {
        Some("first") => {
            let stmt = statement(&mut params)?;
            let column: Option<String> = params.take(2)?;
            Ok(Json(db.first(stmt, column).await?).into_response())
        }
        Some("all") => Ok(Json(db.all(statement(&mut params)?).await?).into_response()),
        Some("raw") => Ok(Json(db.raw(statement(&mut params)?).await?).into_response()),
        Some("run") => Ok(Json(db.run(statement(&mut params)?).await?).into_response()),
        Some("batch") => {
            let statements: Vec<Statement> = params.take(0)?;
            Ok(Json(db.batch(statements).await?).into_response())
        }
        Some("exec") => {
            let query: String = params.take(0)?;
            Ok(Json(db.exec(&query).await?).into_response())
        }
        Some("dump") => {
            let image = db.dump().await?;
            Ok(([(header::CONTENT_TYPE, "application/octet-stream")], image).into_response())
        }
        _ => Err(DispatchError::unsupported(Module::D1, operation)),
    }
}
