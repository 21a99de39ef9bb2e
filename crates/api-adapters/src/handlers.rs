//! # Handlers
//!
//! Thin glue between HTTP requests and `ForumService`.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use domains::{
    Actor, ActorResolver, AppError, DisplayState, NewReply, NewTopic, Page, ReplyWithAuthor,
    ThreadView, Topic, TopicState, TopicSummary, TopicType,
};
use serde::{Deserialize, Serialize};
use services::ForumService;

use crate::error::ApiError;

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub forum: Arc<ForumService>,
    pub actors: Arc<dyn ActorResolver>,
    pub default_limit: i64,
}

/// The caller, resolved from the `Authorization: Bearer` header.
pub struct CurrentActor(pub Actor);

impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let bearer = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        Ok(CurrentActor(state.actors.resolve(bearer)?))
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopicPage {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub data: Vec<TopicSummary>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyBody {
    pub content: String,
    #[serde(default)]
    pub replied_to: i64,
}

#[derive(Debug, Deserialize)]
pub struct TopicBody {
    pub title: String,
    pub content: String,
}

fn require_user(actor: &Actor) -> Result<i64, ApiError> {
    actor
        .user_id
        .ok_or_else(|| ApiError(AppError::Unauthorized("login required".into())))
}

pub async fn list_topics(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((kind, parent_id)): Path<(TopicType, i64)>,
    Query(query): Query<PageQuery>,
) -> Result<Json<TopicPage>, ApiError> {
    let page = Page {
        limit: query.limit.unwrap_or(state.default_limit),
        offset: query.offset.unwrap_or(0),
    };
    let (total, data) = state.forum.list_topics(&actor, kind, parent_id, page).await?;
    Ok(Json(TopicPage { total, limit: page.limit, offset: page.offset, data }))
}

pub async fn get_thread(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((kind, topic_id)): Path<(TopicType, i64)>,
) -> Result<Json<ThreadView>, ApiError> {
    Ok(Json(state.forum.render_thread(&actor, kind, topic_id).await?))
}

pub async fn create_reply(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((kind, topic_id)): Path<(TopicType, i64)>,
    Json(body): Json<ReplyBody>,
) -> Result<(StatusCode, Json<ReplyWithAuthor>), ApiError> {
    let creator_id = require_user(&actor)?;
    let reply = state
        .forum
        .create_reply(&actor, NewReply {
            kind,
            topic_id,
            creator_id,
            content: body.content,
            replied_to: body.replied_to,
            state: TopicState::Normal,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(reply)))
}

pub async fn create_topic(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((kind, parent_id)): Path<(TopicType, i64)>,
    Json(body): Json<TopicBody>,
) -> Result<(StatusCode, Json<Topic>), ApiError> {
    let creator_id = require_user(&actor)?;
    let topic = state
        .forum
        .create_topic(NewTopic {
            kind,
            parent_id,
            creator_id,
            title: body.title,
            content: body.content,
            display: DisplayState::Normal,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(topic)))
}
