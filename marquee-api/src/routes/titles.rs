use actix_web::{
    HttpResponse, Responder, ResponseError, delete, get,
    http::{StatusCode, header::ContentType},
    post, put,
    web::{Data, Json, Path},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use marquee::publish::{EventEnvelope, EventPublisher, PublishError};

use crate::routes::ErrorMessage;
use crate::store::{CatalogStore, Title};

#[derive(Debug, Error)]
pub enum TitleError {
    #[error("The title with id {0} was not found")]
    TitleNotFound(i64),

    #[error("A title with id {0} already exists")]
    TitleAlreadyExists(i64),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("failed to encode the title announcement: {0}")]
    AnnouncementEncoding(#[from] serde_json::Error),
}

impl TitleError {
    pub fn to_message(&self) -> String {
        match self {
            // Do not expose event log details in error messages
            TitleError::Publish(_) | TitleError::AnnouncementEncoding(_) => {
                "internal server error".to_string()
            }
            // Every other message is ok, as they do not divulge sensitive information
            e => e.to_string(),
        }
    }
}

impl ResponseError for TitleError {
    fn status_code(&self) -> StatusCode {
        match self {
            TitleError::TitleNotFound(_) => StatusCode::NOT_FOUND,
            TitleError::TitleAlreadyExists(_) => StatusCode::CONFLICT,
            TitleError::Publish(_) => StatusCode::INTERNAL_SERVER_ERROR,
            TitleError::AnnouncementEncoding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error_message = ErrorMessage {
            error: self.to_message(),
        };
        let body =
            serde_json::to_string(&error_message).expect("failed to serialize error message");
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(body)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTitleRequest {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub overview: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateTitleRequest {
    pub title: String,
    #[serde(default)]
    pub overview: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadTitleResponse {
    pub id: i64,
    pub title: String,
    pub overview: String,
}

impl From<Title> for ReadTitleResponse {
    fn from(title: Title) -> Self {
        Self {
            id: title.id,
            title: title.title,
            overview: title.overview,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadTitlesResponse {
    pub titles: Vec<ReadTitleResponse>,
}

#[post("/titles")]
pub async fn create_title(
    store: Data<CatalogStore>,
    publisher: Data<dyn EventPublisher>,
    title: Json<CreateTitleRequest>,
) -> Result<impl Responder, TitleError> {
    let title = title.into_inner();
    let title = Title {
        id: title.id,
        title: title.title,
        overview: title.overview,
    };

    if !store.insert(title.clone()).await {
        return Err(TitleError::TitleAlreadyExists(title.id));
    }

    // Announce the creation only after the store accepted it. The envelope carries
    // the entity's JSON body unmodified.
    let payload = serde_json::to_vec(&title)?;
    publisher.publish(EventEnvelope::new(payload)).await?;

    let response = ReadTitleResponse::from(title);

    Ok(HttpResponse::Created().json(response))
}

#[get("/titles/{title_id}")]
pub async fn read_title(
    store: Data<CatalogStore>,
    title_id: Path<i64>,
) -> Result<impl Responder, TitleError> {
    let title_id = title_id.into_inner();

    let response = store
        .get(title_id)
        .await
        .map(ReadTitleResponse::from)
        .ok_or(TitleError::TitleNotFound(title_id))?;

    Ok(Json(response))
}

#[put("/titles/{title_id}")]
pub async fn update_title(
    store: Data<CatalogStore>,
    title_id: Path<i64>,
    title: Json<UpdateTitleRequest>,
) -> Result<impl Responder, TitleError> {
    let title_id = title_id.into_inner();
    let title = title.into_inner();
    let title = Title {
        id: title_id,
        title: title.title,
        overview: title.overview,
    };

    if !store.update(title.clone()).await {
        return Err(TitleError::TitleNotFound(title_id));
    }

    let response = ReadTitleResponse::from(title);

    Ok(Json(response))
}

#[delete("/titles/{title_id}")]
pub async fn delete_title(
    store: Data<CatalogStore>,
    title_id: Path<i64>,
) -> Result<impl Responder, TitleError> {
    let title_id = title_id.into_inner();

    if !store.remove(title_id).await {
        return Err(TitleError::TitleNotFound(title_id));
    }

    Ok(HttpResponse::Ok().finish())
}

#[get("/titles")]
pub async fn read_all_titles(store: Data<CatalogStore>) -> Result<impl Responder, TitleError> {
    let titles = store
        .list()
        .await
        .into_iter()
        .map(ReadTitleResponse::from)
        .collect();

    let response = ReadTitlesResponse { titles };

    Ok(Json(response))
}
