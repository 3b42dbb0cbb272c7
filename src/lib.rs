/*!
# Asset Inventory Workbook

A browser-based tool for cleaning up tabular asset inventories, built in Rust.

## Overview

An operator uploads a spreadsheet or CSV inventory, re-sorts it with
per-group subtotal rows, bulk-classifies groups of rows, assigns
sequential asset codes to rows with blank codes, propagates a "group
lead" marker across groups sharing a code prefix, and downloads the
result as an Excel workbook.

## Architecture

The application follows a client-server architecture:

### Core pipeline
- Table - In-memory record set with a fixed column schema, mutated in
  place by every stage
- SortGrouper - Stable multi-column sort with subtotal rows per group
- PendingUpdateQueue - FIFO buffer of classification intents
- ClassificationUpdater - Batch application of queued classifications
- AssetCodeAssigner - Sequential code fill plus group-lead propagation

### Web layer (behind the `web` feature)
- **Technologies**: Rust, axum
- Session-gated JSON API, one endpoint per pipeline stage
- Per-operator workspaces so simultaneous sessions stay isolated
- Multipart upload, calamine Excel parsing, rust_xlsxwriter export

## Modules

- **table**: Table, Row and typed cell values (core state)
- **sorting**: Sort-with-subtotal
- **classify**: Pending update queue and batch classification
- **assets**: Asset code sequence fill and lead propagation
- **state**: Per-session workspace store
- **config**: Designated column names and storage locations
- **loader**: CSV/Excel parsing and format detection
- **downloader**: CSV/XLSX export
- **login**: User authentication and session management
- **app**: Routing and middleware

## REST API Endpoints

- `/api/login`, `/api/signup`, `/api/logout` - Session management
- `/api/upload` - Multipart file upload
- `/api/load` - Parse the uploaded file into the working table
- `/api/sort` - Sort and subtotal by grouping columns
- `/api/columns/extract` - Keep a subset of columns
- `/api/classify/queue`, `/api/classify/apply` - Batched classification
- `/api/assets` - Assign asset codes and propagate group leads
- `/api/table`, `/api/export` - Inspect and download the current table
*/

pub mod assets;
pub mod classify;
pub mod config;
pub mod downloader;
pub mod error;
pub mod loader;
pub mod sorting;
pub mod state;
pub mod table;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod login;

pub use assets::*;
pub use classify::*;
pub use config::*;
pub use downloader::*;
pub use error::*;
pub use loader::*;
pub use sorting::*;
pub use state::*;
pub use table::*;
