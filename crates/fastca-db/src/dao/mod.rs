//! # Data Access Objects
//!
//! One DAO per table. Each operation is a single parameterized statement;
//! there is no business logic here.
//!
//! ## DAO Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    DAO Responsibilities                                 │
//! │                                                                         │
//! │  ItemRepository (facade)                                               │
//! │       │                                                                 │
//! │       ├──► ItemDao                                                     │
//! │       │    ├── observe_all()        live, ORDER BY id                  │
//! │       │    ├── observe_by_id(id)    live, Option<Item>                 │
//! │       │    ├── insert(item)         upsert by id                       │
//! │       │    └── delete(item)         cascades to measurements           │
//! │       │                                                                 │
//! │       └──► MeasurementDao                                              │
//! │            ├── observe_for_owner()  live, ORDER BY created_at          │
//! │            ├── insert(m)            upsert by id                       │
//! │            ├── update(m)            full replace, missing id = no-op   │
//! │            └── delete(m)                                               │
//! │                                                                         │
//! │  Every write that changes rows notifies the InvalidationTracker       │
//! │  after the statement has committed.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod item;
pub mod measurement;
