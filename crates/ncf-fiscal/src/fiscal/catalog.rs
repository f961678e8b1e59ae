use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::document::{Counterparty, DocumentKind};

/// Two-digit DGII document type code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeCode(String);

impl TypeCode {
    pub fn new(code: &str) -> Result<Self, CatalogError> {
        let bytes = code.as_bytes();
        if bytes.len() == 2 && bytes.iter().all(u8::is_ascii_digit) {
            Ok(Self(code.to_string()))
        } else {
            Err(CatalogError::InvalidCode {
                code: code.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TypeCode {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<TypeCode> for String {
    fn from(value: TypeCode) -> Self {
        value.0
    }
}

/// A class of fiscal document as authorized by the DGII.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentType {
    pub code: TypeCode,
    pub name: String,
    pub is_fiscal: bool,
    pub for_sale: bool,
    pub for_purchase: bool,
    pub requires_tax_id: bool,
    pub active: bool,
}

/// Catalog of configured document types, keyed by their unique code.
#[derive(Debug, Default, Clone)]
pub struct DocumentTypeCatalog {
    types: BTreeMap<TypeCode, DocumentType>,
}

// (code, name, fiscal, sale, purchase, requires tax id)
const STANDARD_TYPES: [(&str, &str, bool, bool, bool, bool); 6] = [
    ("01", "Factura de Crédito Fiscal", true, true, false, true),
    ("02", "Factura de Consumo", true, true, false, false),
    ("03", "Nota de Débito", true, true, false, true),
    ("04", "Nota de Crédito", true, true, false, true),
    ("14", "Régimen Especial", true, true, false, true),
    ("15", "Gubernamental", true, true, false, true),
];

impl DocumentTypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog seeded with the DGII types the module ships by default.
    pub fn standard() -> Self {
        let mut types = BTreeMap::new();
        for (code, name, is_fiscal, for_sale, for_purchase, requires_tax_id) in STANDARD_TYPES {
            let code = TypeCode(code.to_string());
            types.insert(
                code.clone(),
                DocumentType {
                    code,
                    name: name.to_string(),
                    is_fiscal,
                    for_sale,
                    for_purchase,
                    requires_tax_id,
                    active: true,
                },
            );
        }
        Self { types }
    }

    pub fn register(&mut self, document_type: DocumentType) -> Result<(), CatalogError> {
        if self.types.contains_key(&document_type.code) {
            return Err(CatalogError::DuplicateCode {
                code: document_type.code.to_string(),
            });
        }
        self.types.insert(document_type.code.clone(), document_type);
        Ok(())
    }

    pub fn get(&self, code: &TypeCode) -> Option<&DocumentType> {
        self.types.get(code)
    }

    pub fn sale_types(&self) -> impl Iterator<Item = &DocumentType> {
        self.types
            .values()
            .filter(|document_type| document_type.for_sale && document_type.active)
    }

    /// Advisory pick of a sale document type from counterparty attributes.
    ///
    /// Credit and debit notes map to 04, registered taxpayers to 01 (crédito
    /// fiscal), everyone else to 02 (consumo). This is UI convenience only;
    /// the binder never calls it.
    pub fn suggest_for_sale(
        &self,
        kind: DocumentKind,
        counterparty: &Counterparty,
    ) -> Option<&DocumentType> {
        if !kind.is_sale() {
            return None;
        }
        let code = if kind.is_amendment() {
            "04"
        } else if counterparty.has_tax_id() && counterparty.is_registered_taxpayer {
            "01"
        } else {
            "02"
        };
        self.types
            .get(&TypeCode(code.to_string()))
            .filter(|document_type| document_type.for_sale && document_type.active)
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("document type code '{code}' must be exactly two digits")]
    InvalidCode { code: String },
    #[error("a document type with code {code} already exists")]
    DuplicateCode { code: String },
}
