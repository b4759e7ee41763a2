//! SeaORM implementation of SubVenueRepository

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};

use crate::domain::slot::Category;
use crate::domain::sub_venue::{SubVenue, SubVenueRepository};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::sub_venue;

pub struct SeaOrmSubVenueRepository {
    db: DatabaseConnection,
}

impl SeaOrmSubVenueRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: sub_venue::Model) -> DomainResult<SubVenue> {
    let categories: Vec<Category> = serde_json::from_str(&m.categories).map_err(|e| {
        DomainError::Storage(format!("Corrupt categories on sub-venue {}: {}", m.id, e))
    })?;

    Ok(SubVenue {
        id: m.id,
        venue_id: m.venue_id,
        name: m.name,
        latitude: m.latitude,
        longitude: m.longitude,
        categories,
        created_at: m.created_at,
    })
}

#[async_trait]
impl SubVenueRepository for SeaOrmSubVenueRepository {
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<SubVenue>> {
        sub_venue::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(model_to_domain)
            .transpose()
    }

    async fn save(&self, s: &SubVenue) -> DomainResult<()> {
        let categories =
            serde_json::to_string(&s.categories).map_err(|e| DomainError::Storage(e.to_string()))?;

        let model = sub_venue::ActiveModel {
            id: Set(s.id.clone()),
            venue_id: Set(s.venue_id.clone()),
            name: Set(s.name.clone()),
            latitude: Set(s.latitude),
            longitude: Set(s.longitude),
            categories: Set(categories),
            created_at: Set(s.created_at),
        };

        sub_venue::Entity::insert(model)
            .on_conflict(
                OnConflict::column(sub_venue::Column::Id)
                    .update_columns([
                        sub_venue::Column::Name,
                        sub_venue::Column::Latitude,
                        sub_venue::Column::Longitude,
                        sub_venue::Column::Categories,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
