//! hermes-bitmap - Roaring bitmap engine for compressed u32 sets
//!
//! Values are partitioned by their high 16 bits into independently
//! compressed containers over the low 16 bits:
//! - Sparse containers: sorted u16 arrays, at cardinality <= 4096
//! - Dense containers: 65536-bit bitmaps with a maintained counter
//!
//! Containers convert between the two forms automatically as set
//! operations move their cardinality across the threshold, so memory and
//! speed stay near-optimal for any distribution. The same layout is used
//! by Apache Lucene, Spark, Druid, and many databases.
//!
//! # Example
//!
//! ```rust
//! use hermes_bitmap::RoaringBitmap;
//!
//! let mut weekdays = RoaringBitmap::new();
//! weekdays.insert_range(0, 5);
//! let mut on_call = RoaringBitmap::new();
//! on_call.insert(4);
//! on_call.insert(6);
//!
//! let both = weekdays.and(&on_call);
//! assert_eq!(both.cardinality(), 1);
//! assert!(both.contains(4));
//! ```

mod bits;
mod container;
mod roaring;
mod roaring_array;

pub mod error;

pub use container::{ARRAY_TO_BITMAP_THRESHOLD, CONTAINER_CAPACITY};
pub use error::{Error, Result};
pub use roaring::{RoaringBitmap, RoaringBitmapIter};
pub use roaring_array::SERIAL_COOKIE;
