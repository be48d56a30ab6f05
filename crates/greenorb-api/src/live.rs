//! Handler for `GET /companies/{name}/live`.

use axum::{
  Json,
  extract::{Path, State},
};
use greenorb_llm::TextGenerator;
use greenorb_pipeline::{LiveInsight, live_insight};

use crate::{ApiState, error::ApiError};

/// `GET /companies/{name}/live`: latest ESG news and targets, straight from
/// the model. The company does not have to be in the store.
pub async fn handler<S, G>(
  State(state): State<ApiState<S, G>>,
  Path(name): Path<String>,
) -> Result<Json<LiveInsight>, ApiError>
where
  G: TextGenerator,
{
  let name = name.trim();
  if name.is_empty() {
    return Err(ApiError::BadRequest("name must not be empty".into()));
  }
  Ok(Json(live_insight(state.generator.as_ref(), name).await?))
}
