// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Fixture entity types
//!
//! | Type     | Relationship | Edge       | Shape                        |
//! |----------|--------------|------------|------------------------------|
//! | Person   | friends      | KNOWS      | many, outgoing, cascade      |
//! | Person   | manager      | REPORTS_TO | single, outgoing, cascade    |
//! | Person   | siblings     | SIBLING_OF | many, both, cascade          |
//! | Company  | -            |            |                              |
//! | Employee | employer     | WORKS_FOR  | single, outgoing, cascade    |
//! | Team     | members      | HAS_MEMBER | many, outgoing, no cascade   |
//! | Account  | owner        | OWNS       | single, incoming, not lazy   |
//!
//! Account uses a caller-assigned string id; the others use generated ids.

use graphlite_orm::{
    Direction, Entity, EntityMetadata, EntityRef, FromValue, OrmError, OrmResult, PropertyMap,
    PropertyMetadata, PropertyType, RelatedMany, RelatedOne, Relation, RelationSlot,
    RelationValue, RelationshipMetadata, Value,
};

fn unknown_field(entity: &str, field: &str) -> OrmError {
    OrmError::Mapping(format!("{} has no field '{}'", entity, field))
}

fn unknown_relationship(entity: &str, field: &str) -> OrmError {
    OrmError::Relationship(format!("{} has no relationship '{}'", entity, field))
}

#[derive(Debug, Default)]
pub struct Person {
    pub id: Option<i64>,
    pub name: String,
    pub age: Option<i64>,
    pub friends: RelatedMany<Person>,
    pub manager: RelatedOne<Person>,
    pub siblings: RelatedMany<Person>,
}

impl Entity for Person {
    fn metadata() -> EntityMetadata {
        EntityMetadata::new("Person")
            .property(PropertyMetadata::generated_id("id"))
            .property(PropertyMetadata::new("name", PropertyType::String).interned().required())
            .property(PropertyMetadata::new("age", PropertyType::Integer))
            .relationship(RelationshipMetadata::many("friends", "KNOWS", "Person").cascade(true))
            .relationship(
                RelationshipMetadata::single("manager", "REPORTS_TO", "Person").cascade(true),
            )
            .relationship(
                RelationshipMetadata::many("siblings", "SIBLING_OF", "Person")
                    .direction(Direction::Both)
                    .cascade(true),
            )
    }

    fn from_properties(mut props: PropertyMap) -> OrmResult<Self> {
        Ok(Self {
            id: props.take("id")?,
            name: props.take("name")?,
            age: props.take("age")?,
            ..Self::default()
        })
    }

    fn to_properties(&self) -> PropertyMap {
        PropertyMap::new()
            .with("id", self.id)
            .with("name", self.name.as_str())
            .with("age", self.age)
    }

    fn set_property(&mut self, field: &str, value: Value) -> OrmResult<()> {
        match field {
            "id" => self.id = FromValue::from_value(value)?,
            "name" => self.name = FromValue::from_value(value)?,
            "age" => self.age = FromValue::from_value(value)?,
            other => return Err(unknown_field("Person", other)),
        }
        Ok(())
    }

    fn relationship(&self, field: &str) -> RelationValue {
        match field {
            "friends" => self.friends.value(),
            "manager" => self.manager.value(),
            "siblings" => self.siblings.value(),
            _ => RelationValue::Unset,
        }
    }

    fn attach_relationship(&mut self, field: &str, slot: RelationSlot) -> OrmResult<()> {
        match field {
            "friends" => self.friends.attach(slot),
            "manager" => self.manager.attach(slot),
            "siblings" => self.siblings.attach(slot),
            other => Err(unknown_relationship("Person", other)),
        }
    }
}

pub fn person(name: &str) -> EntityRef<Person> {
    EntityRef::new(Person {
        name: name.to_string(),
        ..Person::default()
    })
}

pub fn person_aged(name: &str, age: i64) -> EntityRef<Person> {
    EntityRef::new(Person {
        name: name.to_string(),
        age: Some(age),
        ..Person::default()
    })
}

#[derive(Debug, Default)]
pub struct Company {
    pub id: Option<i64>,
    pub name: String,
}

impl Entity for Company {
    fn metadata() -> EntityMetadata {
        EntityMetadata::new("Company")
            .property(PropertyMetadata::generated_id("id"))
            .property(PropertyMetadata::new("name", PropertyType::String))
    }

    fn from_properties(mut props: PropertyMap) -> OrmResult<Self> {
        Ok(Self {
            id: props.take("id")?,
            name: props.take::<Option<String>>("name")?.unwrap_or_default(),
        })
    }

    fn to_properties(&self) -> PropertyMap {
        PropertyMap::new()
            .with("id", self.id)
            .with("name", self.name.as_str())
    }

    fn set_property(&mut self, field: &str, value: Value) -> OrmResult<()> {
        match field {
            "id" => self.id = FromValue::from_value(value)?,
            "name" => self.name = FromValue::from_value(value)?,
            other => return Err(unknown_field("Company", other)),
        }
        Ok(())
    }
}

pub fn company(name: &str) -> EntityRef<Company> {
    EntityRef::new(Company {
        id: None,
        name: name.to_string(),
    })
}

#[derive(Debug, Default)]
pub struct Employee {
    pub id: Option<i64>,
    pub name: String,
    pub employer: RelatedOne<Company>,
}

impl Entity for Employee {
    fn metadata() -> EntityMetadata {
        EntityMetadata::new("Employee")
            .labels(&["Employee", "Staff"])
            .property(PropertyMetadata::generated_id("id"))
            .property(PropertyMetadata::new("name", PropertyType::String).storage_name("full_name"))
            .relationship(
                RelationshipMetadata::single("employer", "WORKS_FOR", "Company").cascade(true),
            )
    }

    fn from_properties(mut props: PropertyMap) -> OrmResult<Self> {
        Ok(Self {
            id: props.take("id")?,
            name: props.take::<Option<String>>("name")?.unwrap_or_default(),
            employer: Relation::Unset,
        })
    }

    fn to_properties(&self) -> PropertyMap {
        PropertyMap::new()
            .with("id", self.id)
            .with("name", self.name.as_str())
    }

    fn set_property(&mut self, field: &str, value: Value) -> OrmResult<()> {
        match field {
            "id" => self.id = FromValue::from_value(value)?,
            "name" => self.name = FromValue::from_value(value)?,
            other => return Err(unknown_field("Employee", other)),
        }
        Ok(())
    }

    fn relationship(&self, field: &str) -> RelationValue {
        match field {
            "employer" => self.employer.value(),
            _ => RelationValue::Unset,
        }
    }

    fn attach_relationship(&mut self, field: &str, slot: RelationSlot) -> OrmResult<()> {
        match field {
            "employer" => self.employer.attach(slot),
            other => Err(unknown_relationship("Employee", other)),
        }
    }
}

pub fn employee(name: &str) -> EntityRef<Employee> {
    EntityRef::new(Employee {
        name: name.to_string(),
        ..Employee::default()
    })
}

#[derive(Debug, Default)]
pub struct Team {
    pub id: Option<i64>,
    pub name: String,
    pub members: RelatedMany<Person>,
}

impl Entity for Team {
    fn metadata() -> EntityMetadata {
        EntityMetadata::new("Team")
            .property(PropertyMetadata::generated_id("id"))
            .property(PropertyMetadata::new("name", PropertyType::String))
            .relationship(RelationshipMetadata::many("members", "HAS_MEMBER", "Person"))
    }

    fn from_properties(mut props: PropertyMap) -> OrmResult<Self> {
        Ok(Self {
            id: props.take("id")?,
            name: props.take::<Option<String>>("name")?.unwrap_or_default(),
            members: Relation::Unset,
        })
    }

    fn to_properties(&self) -> PropertyMap {
        PropertyMap::new()
            .with("id", self.id)
            .with("name", self.name.as_str())
    }

    fn set_property(&mut self, field: &str, value: Value) -> OrmResult<()> {
        match field {
            "id" => self.id = FromValue::from_value(value)?,
            "name" => self.name = FromValue::from_value(value)?,
            other => return Err(unknown_field("Team", other)),
        }
        Ok(())
    }

    fn relationship(&self, field: &str) -> RelationValue {
        match field {
            "members" => self.members.value(),
            _ => RelationValue::Unset,
        }
    }

    fn attach_relationship(&mut self, field: &str, slot: RelationSlot) -> OrmResult<()> {
        match field {
            "members" => self.members.attach(slot),
            other => Err(unknown_relationship("Team", other)),
        }
    }
}

pub fn team(name: &str) -> EntityRef<Team> {
    EntityRef::new(Team {
        name: name.to_string(),
        ..Team::default()
    })
}

#[derive(Debug, Default)]
pub struct Account {
    pub number: Option<String>,
    pub balance: f64,
    pub owner: RelatedOne<Person>,
}

impl Entity for Account {
    fn metadata() -> EntityMetadata {
        EntityMetadata::new("Account")
            .property(PropertyMetadata::id("number", PropertyType::String))
            .property(PropertyMetadata::new("balance", PropertyType::Float))
            .relationship(
                RelationshipMetadata::single("owner", "OWNS", "Person")
                    .direction(Direction::Incoming)
                    .lazy(false),
            )
    }

    fn from_properties(mut props: PropertyMap) -> OrmResult<Self> {
        Ok(Self {
            number: props.take("number")?,
            balance: props.take::<Option<f64>>("balance")?.unwrap_or_default(),
            owner: Relation::Unset,
        })
    }

    fn to_properties(&self) -> PropertyMap {
        PropertyMap::new()
            .with("number", self.number.clone())
            .with("balance", self.balance)
    }

    fn set_property(&mut self, field: &str, value: Value) -> OrmResult<()> {
        match field {
            "number" => self.number = FromValue::from_value(value)?,
            "balance" => self.balance = FromValue::from_value(value)?,
            other => return Err(unknown_field("Account", other)),
        }
        Ok(())
    }

    fn relationship(&self, field: &str) -> RelationValue {
        match field {
            "owner" => self.owner.value(),
            _ => RelationValue::Unset,
        }
    }

    fn attach_relationship(&mut self, field: &str, slot: RelationSlot) -> OrmResult<()> {
        match field {
            "owner" => self.owner.attach(slot),
            other => Err(unknown_relationship("Account", other)),
        }
    }
}

pub fn account(number: &str, balance: f64) -> EntityRef<Account> {
    EntityRef::new(Account {
        number: Some(number.to_string()),
        balance,
        owner: Relation::Unset,
    })
}
