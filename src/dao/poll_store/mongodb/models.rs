use mongodb::bson::{Bson, DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MongoDaoError;
use crate::dao::models::{PollEntity, PollOptionEntity, PollStatusEntity};

/// Poll as laid out in the `polls` collection. The id is stored as its hyphenated string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPollDocument {
    #[serde(rename = "_id")]
    id: String,
    question: String,
    options: Vec<MongoOptionDocument>,
    status: PollStatusEntity,
    created_at: DateTime,
    ended_at: Option<DateTime>,
    max_time_seconds: i64,
    correct_option_id: Option<i32>,
    correct_answers_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoOptionDocument {
    id: i32,
    text: String,
    votes: i64,
}

impl From<&PollOptionEntity> for MongoOptionDocument {
    fn from(option: &PollOptionEntity) -> Self {
        Self {
            id: i32::from(option.id),
            text: option.text.clone(),
            votes: i64::from(option.votes),
        }
    }
}

impl From<PollEntity> for MongoPollDocument {
    fn from(value: PollEntity) -> Self {
        Self {
            id: value.id.to_string(),
            question: value.question,
            options: value.options.iter().map(Into::into).collect(),
            status: value.status,
            created_at: DateTime::from_system_time(value.created_at),
            ended_at: value.ended_at.map(DateTime::from_system_time),
            max_time_seconds: i64::from(value.max_time_seconds),
            correct_option_id: value.correct_option_id.map(i32::from),
            correct_answers_count: i64::from(value.correct_answers_count),
        }
    }
}

impl TryFrom<MongoPollDocument> for PollEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoPollDocument) -> Result<Self, Self::Error> {
        let corrupt = || MongoDaoError::CorruptPoll {
            id: value.id.clone(),
        };

        let id = Uuid::parse_str(&value.id).map_err(|_| corrupt())?;
        let options = value
            .options
            .iter()
            .map(|option| {
                Ok(PollOptionEntity {
                    id: u8::try_from(option.id).map_err(|_| corrupt())?,
                    text: option.text.clone(),
                    votes: u32::try_from(option.votes).map_err(|_| corrupt())?,
                })
            })
            .collect::<Result<Vec<_>, MongoDaoError>>()?;
        let correct_option_id = value
            .correct_option_id
            .map(u8::try_from)
            .transpose()
            .map_err(|_| corrupt())?;

        Ok(Self {
            id,
            question: value.question.clone(),
            options,
            status: value.status,
            created_at: value.created_at.to_system_time(),
            ended_at: value.ended_at.map(DateTime::to_system_time),
            max_time_seconds: u32::try_from(value.max_time_seconds).map_err(|_| corrupt())?,
            correct_option_id,
            correct_answers_count: u32::try_from(value.correct_answers_count)
                .map_err(|_| corrupt())?,
        })
    }
}

/// Filter matching a poll document by id.
pub fn doc_id(id: Uuid) -> Document {
    doc! { "_id": id.to_string() }
}

/// Option tallies encoded for a `$set` update.
pub fn options_bson(options: &[PollOptionEntity]) -> Bson {
    let documents = options
        .iter()
        .map(|option| {
            doc! {
                "id": i32::from(option.id),
                "text": option.text.as_str(),
                "votes": i64::from(option.votes),
            }
        })
        .collect::<Vec<_>>();
    Bson::from(documents)
}
