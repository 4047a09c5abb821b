//! Declarative transcoding between wire messages, mappings and validated
//! native values.

pub mod attribute;
pub mod binding;
pub mod bridge;
mod config;
mod config_option;
pub mod declaration;
pub mod error;
pub mod field;
pub mod field_view;
pub mod list_serializer;
pub mod serializer;
pub mod transcoder;
pub mod value;
pub mod wire;

pub use {self::config::*, self::config_option::*};

pub use bridge::{normalize, Normalized, Source};
pub use declaration::{DeclarationBuilder, SerializerDeclaration};
pub use error::{CallableFailure, ConfigurationError, ErrorDetail, FieldError, TranscodeError, WireError};
pub use field::{Field, FieldKind, LeafKind};
pub use field_view::FieldView;
pub use list_serializer::ListSerializer;
pub use serializer::Serializer;
pub use transcoder::{Transcoder, WirePayload};
pub use value::{Attribute, Instance, NativeMap, NativeValue};
pub use wire::{ProstSchema, WireMessage, WireSchema};
