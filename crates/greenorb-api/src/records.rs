//! Handlers for the record endpoints.
//!
//! | Method   | Path            | Notes |
//! |----------|-----------------|-------|
//! | `POST`   | `/scout`        | Body: [`CompanyBody`]; replaces any same-named company |
//! | `POST`   | `/analyze`      | Body: [`AnalysisBody`] |
//! | `POST`   | `/risk`         | Body: [`Risk`] |
//! | `POST`   | `/strategy`     | Body: [`StrategyBody`] |
//! | `GET`    | `/data`         | Joined rows, newest first; `ETag` / `If-None-Match` |
//! | `DELETE` | `/data`         | Clears every record and the feed |
//! | `GET`    | `/state/{key}`  | One collection or value |
//! | `GET`    | `/feed`         | `?limit`, default 20 |

use axum::{
  Json,
  extract::{Path, Query, State, rejection::JsonRejection},
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use greenorb_core::{
  activity::{ActivityEntry, NewActivity},
  event::EventKind,
  record::{
    Action, Analysis, Company, Keyed, PeerRank, Recommendation, Record, Risk, Scopes, Strategy,
    Timeline, Trend, clamp_score,
  },
  store::EsgStore,
};
use greenorb_wire::parse_number;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};

use crate::{
  ApiState,
  error::ApiError,
  etag::{compute_etag, is_fresh},
};

const DEFAULT_FEED_LIMIT: usize = 20;

// ─── Upserts ─────────────────────────────────────────────────────────────────

/// A number sent as JSON or as text (`"120"`, `"1,234.5 Mt"`). Text without
/// a number reads as absent.
fn lenient_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Number(f64),
    Text(String),
  }
  Ok(match Option::<Raw>::deserialize(d)? {
    Some(Raw::Number(n)) => Some(n),
    Some(Raw::Text(t)) => parse_number(&t),
    None => None,
  })
}

fn score(value: Option<f64>) -> Option<u8> { value.map(|n| clamp_score(n.round() as i64)) }

/// JSON body accepted by `POST /scout`. `ts` defaults to now.
#[derive(Debug, Deserialize)]
pub struct CompanyBody {
  pub name:        String,
  pub sector:      Option<String>,
  pub country:     Option<String>,
  #[serde(default, deserialize_with = "lenient_number")]
  pub co2:         Option<f64>,
  #[serde(alias = "grade")]
  pub esg:         Option<String>,
  pub url:         Option<String>,
  pub products:    Option<String>,
  pub methodology: Option<String>,
  #[serde(default, deserialize_with = "lenient_number")]
  pub s1:          Option<f64>,
  #[serde(default, deserialize_with = "lenient_number")]
  pub s2:          Option<f64>,
  #[serde(default, deserialize_with = "lenient_number")]
  pub s3:          Option<f64>,
  pub report_year: Option<i32>,
  pub ts:          Option<DateTime<Utc>>,
}

impl From<CompanyBody> for Company {
  fn from(b: CompanyBody) -> Self {
    Company {
      name:          b.name.trim().to_owned(),
      sector:        b.sector,
      country:       b.country,
      co2_mt:        b.co2,
      grade:         b.esg,
      url:           b.url,
      products:      b.products,
      methodology:   b.methodology,
      scopes:        Scopes { s1: b.s1, s2: b.s2, s3: b.s3 },
      report_year:   b.report_year,
      discovered_at: b.ts.unwrap_or_else(Utc::now),
    }
  }
}

/// JSON body accepted by `POST /analyze`. Scores are clamped to 0–100.
#[derive(Debug, Deserialize)]
pub struct AnalysisBody {
  pub company:        String,
  #[serde(default, deserialize_with = "lenient_number")]
  pub score:          Option<f64>,
  #[serde(default, deserialize_with = "lenient_number")]
  pub e_score:        Option<f64>,
  #[serde(default, deserialize_with = "lenient_number")]
  pub s_score:        Option<f64>,
  #[serde(default, deserialize_with = "lenient_number")]
  pub g_score:        Option<f64>,
  pub trend:          Option<Trend>,
  pub peer:           Option<PeerRank>,
  pub strengths:      Option<String>,
  pub weaknesses:     Option<String>,
  pub recommendation: Option<Recommendation>,
}

impl From<AnalysisBody> for Analysis {
  fn from(b: AnalysisBody) -> Self {
    Analysis {
      company:        b.company.trim().to_owned(),
      score:          score(b.score),
      e_score:        score(b.e_score),
      s_score:        score(b.s_score),
      g_score:        score(b.g_score),
      trend:          b.trend,
      peer:           b.peer,
      strengths:      b.strengths,
      weaknesses:     b.weaknesses,
      recommendation: b.recommendation,
    }
  }
}

/// JSON body accepted by `POST /strategy`. `confidence` is clamped to 0–100.
#[derive(Debug, Deserialize)]
pub struct StrategyBody {
  pub company:      String,
  pub action:       Option<Action>,
  #[serde(default, deserialize_with = "lenient_number")]
  pub confidence:   Option<f64>,
  pub rationale:    Option<String>,
  pub price_impact: Option<String>,
  pub catalyst:     Option<String>,
  pub timeline:     Option<Timeline>,
}

impl From<StrategyBody> for Strategy {
  fn from(b: StrategyBody) -> Self {
    Strategy {
      company:      b.company.trim().to_owned(),
      action:       b.action,
      confidence:   score(b.confidence),
      rationale:    b.rationale,
      price_impact: b.price_impact,
      catalyst:     b.catalyst,
      timeline:     b.timeline,
    }
  }
}

async fn upsert<S, G>(state: &ApiState<S, G>, record: Record) -> Result<Json<Value>, ApiError>
where
  S: EsgStore,
{
  if record.key().is_empty() {
    return Err(ApiError::BadRequest("name must not be empty".into()));
  }
  tracing::debug!(name = record.name(), "upserting record");
  state
    .store
    .append(vec![EventKind::Upserted(record)])
    .await
    .map_err(ApiError::store)?;
  Ok(Json(json!({ "success": true })))
}

/// `POST /scout`
pub async fn upsert_company<S, G>(
  State(state): State<ApiState<S, G>>,
  body: Result<Json<CompanyBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
  S: EsgStore,
{
  let Json(body) = body?;
  upsert(&state, Record::Company(body.into())).await
}

/// `POST /analyze`
pub async fn upsert_analysis<S, G>(
  State(state): State<ApiState<S, G>>,
  body: Result<Json<AnalysisBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
  S: EsgStore,
{
  let Json(body) = body?;
  upsert(&state, Record::Analysis(body.into())).await
}

/// `POST /risk`
pub async fn upsert_risk<S, G>(
  State(state): State<ApiState<S, G>>,
  body: Result<Json<Risk>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
  S: EsgStore,
{
  let Json(risk) = body?;
  upsert(&state, Record::Risk(risk)).await
}

/// `POST /strategy`
pub async fn upsert_strategy<S, G>(
  State(state): State<ApiState<S, G>>,
  body: Result<Json<StrategyBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError>
where
  S: EsgStore,
{
  let Json(body) = body?;
  upsert(&state, Record::Strategy(body.into())).await
}

// ─── Data ────────────────────────────────────────────────────────────────────

/// `GET /data`: every company left-joined with its downstream records.
pub async fn data<S, G>(
  State(state): State<ApiState<S, G>>,
  headers: HeaderMap,
) -> Result<Response, ApiError>
where
  S: EsgStore,
{
  let body = {
    let view = state.view().await?;
    serde_json::to_vec(&view.projection().data_rows())?
  };
  let etag = compute_etag(&body);

  if is_fresh(&headers, &etag) {
    return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
  }
  Ok(
    (
      StatusCode::OK,
      [(header::CONTENT_TYPE, "application/json".to_owned()), (header::ETAG, etag)],
      body,
    )
      .into_response(),
  )
}

/// `DELETE /data`: drop every record and the feed. The Scout cursor stays.
pub async fn clear<S, G>(State(state): State<ApiState<S, G>>) -> Result<Json<Value>, ApiError>
where
  S: EsgStore,
{
  state.store.clear().await.map_err(ApiError::store)?;
  tracing::info!("all records cleared");
  if let Err(e) = state.store.record_activity(NewActivity::system("All data cleared")).await {
    tracing::warn!(error = %e, "writing the activity feed failed");
  }
  Ok(Json(json!({ "success": true })))
}

// ─── State ───────────────────────────────────────────────────────────────────

/// `GET /state/{key}`
pub async fn state<S, G>(
  State(state): State<ApiState<S, G>>,
  Path(key): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  S: EsgStore,
{
  if key == "feed" {
    let entries = recent(&state, state.feed_cap).await?;
    return Ok(Json(serde_json::to_value(entries)?));
  }

  let view = state.view().await?;
  let p = view.projection();
  let value = match key.as_str() {
    "companies" => serde_json::to_value(p.companies().iter().collect::<Vec<_>>())?,
    "analyses" => serde_json::to_value(p.analyses().iter().collect::<Vec<_>>())?,
    "risks" => serde_json::to_value(p.risks().iter().collect::<Vec<_>>())?,
    "strategies" => serde_json::to_value(p.strategies().iter().collect::<Vec<_>>())?,
    "sector_index" => json!(p.sector_index()),
    _ => return Err(ApiError::NotFound(format!("unknown state key {key:?}"))),
  };
  Ok(Json(value))
}

// ─── Feed ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FeedParams {
  pub limit: Option<usize>,
}

/// `GET /feed[?limit=N]`: oldest first.
pub async fn feed<S, G>(
  State(state): State<ApiState<S, G>>,
  Query(params): Query<FeedParams>,
) -> Result<Json<Vec<ActivityEntry>>, ApiError>
where
  S: EsgStore,
{
  let limit = params.limit.unwrap_or(DEFAULT_FEED_LIMIT).min(state.feed_cap);
  Ok(Json(recent(&state, limit).await?))
}

async fn recent<S: EsgStore, G>(
  state: &ApiState<S, G>,
  limit: usize,
) -> Result<Vec<ActivityEntry>, ApiError> {
  state.store.recent_activity(limit).await.map_err(ApiError::store)
}
