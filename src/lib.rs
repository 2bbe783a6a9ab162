/*!
# Report Portal

Report-result viewer and Excel exporter for a multi-tenant reporting portal, built in Rust.

## Overview

The reporting backend describes a report as a sparse list of cells: each cell
has a zero-based anchor (`row`, `col`), optional `rowspan`/`colspan`, a value
and `0xAARRGGBB` colors. This crate turns that description into a dense,
conflict-free grid, renders it as a merged-cell HTML table and exports the same
grid to a styled `.xlsx` workbook.

## Architecture

### Core
- **Payload normalisation** - accepts a single cell, a flat list or a list of
  rows for each of the `records`, `headers` and `footer` groups
- **Grid Reconciler** - builds the dense grid; records are placed before
  headers and footers so a miscalculated header span can never swallow data
- **Color conversion** - backend ARGB to CSS and back to workbook ARGB
- **Spreadsheet Exporter** - title and date rows, merges, fills, fonts,
  borders, column widths; rejected merges are reported as warnings

### Web Layer (feature `web`)
- **Technologies**: Rust, axum, handlebars
- Report views are kept in memory per opened report and rebuilt from the
  request payload; nothing is persisted. Only the most recently used views
  are kept (`REPORT_PORTAL_MAX_REPORTS`)
- Reports can also be generated server-side: the report's `endPoint` is
  called with the chosen period and tenant through `reqwest`

## Modules

- **cell**: descriptor and resolved grid cell types
- **payload**: backend envelope and cell group flattening
- **grid**: grid reconciliation
- **color**: color and font style conversion
- **render**: HTML table view model and result page
- **export**: workbook plan, xlsx writer, export guard
- **daterange**: report periods and quick ranges
- **report**: an opened report result
- **config**: server configuration
- **backend**: report generation against the reporting backend
- **app**: routes and handlers

## REST API Endpoints

- `POST /api/reports` - Opens a report result from the backend response
- `POST /api/reports/generate` - Fetches a report from the backend and opens it
- `DELETE /api/reports/{id}` - Closes a report result
- `GET /reports/{id}` - Result page
- `GET /api/reports/{id}/grid` - Dense grid as JSON
- `GET /api/reports/{id}/export` - Excel download
- `GET /api/date-range` - Quick or custom report period
*/

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod backend;
pub mod cell;
pub mod color;
pub mod config;
pub mod daterange;
pub mod error;
pub mod export;
pub mod grid;
pub mod payload;
pub mod render;
pub mod report;

/// Re-export everything from these modules to make it easier to use
pub use cell::*;
pub use color::*;
pub use daterange::*;
pub use error::*;
pub use export::*;
pub use grid::*;
pub use payload::*;
pub use render::*;
pub use report::*;
