//! Uniform CRUD over `/<module>/<resource>/` endpoints.

pub mod users;

use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use users::{CreateUser, RoleRecord, UpdateUser, UserAdmin};

use crate::error::GatewayResult;
use crate::gateway::{ApiRequest, Gateway};
use crate::models::Page;

/// Collection paths known to the clinic API.
pub mod paths {
    pub const CLIENTS: &str = "clientes/clientes";
    pub const CLIENT_ADDRESSES: &str = "clientes/direcciones";
    pub const PETS: &str = "mascotas/mascotas";
    pub const SPECIES: &str = "mascotas/especies";
    pub const BREEDS: &str = "mascotas/razas";
    pub const CONSULTATIONS: &str = "citas/consultas";
    pub const MEDICAL_HISTORIES: &str = "historial-medico/historiales";
    pub const VACCINATIONS: &str = "historial-medico/vacunaciones";
    pub const MEDICATIONS: &str = "inventario/medicamentos";
    pub const MEDICATION_BATCHES: &str = "inventario/lotes";
    pub const SUPPLIERS: &str = "inventario/proveedores";
    pub const INVOICES: &str = "facturacion/facturas";
    pub const SERVICES: &str = "facturacion/servicios";
    pub const USERS: &str = "auth/users";
    pub const ROLES: &str = "auth/roles";
}

/// Pagination and filter parameters for list calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub filters: Vec<(String, String)>,
}

impl ListParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Extra filter, e.g. `("cliente", "4")` or `("search", "luna")`.
    pub fn filter(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push((key.into(), value.to_string()));
        self
    }

    fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::with_capacity(self.filters.len() + 2);
        if let Some(page) = self.page {
            query.push(("page".to_string(), page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            query.push(("page_size".to_string(), page_size.to_string()));
        }
        query.extend(self.filters.iter().cloned());
        query
    }
}

/// Typed client for one collection.
pub struct Resource<T> {
    gateway: Arc<Gateway>,
    collection: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            collection: self.collection.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> Resource<T> {
    /// Resource at `collection`, e.g. [`paths::CLIENTS`].
    pub fn new(gateway: Arc<Gateway>, collection: &str) -> Self {
        let trimmed = collection.trim_matches('/');
        Self {
            gateway,
            collection: format!("/{trimmed}/"),
            _marker: PhantomData,
        }
    }

    /// Collection path with leading and trailing slash.
    pub fn collection_path(&self) -> &str {
        &self.collection
    }

    pub fn item_path(&self, id: impl Display) -> String {
        format!("{}{id}/", self.collection)
    }

    pub async fn list(&self, params: &ListParams) -> GatewayResult<Page<T>> {
        let request = ApiRequest::get(self.collection.as_str()).query_pairs(params.to_query());
        self.gateway.send_json(request).await
    }

    pub async fn get(&self, id: impl Display) -> GatewayResult<T> {
        self.gateway.get(&self.item_path(id)).await
    }

    pub async fn create<B: Serialize + ?Sized>(&self, body: &B) -> GatewayResult<T> {
        self.gateway.post(&self.collection, body).await
    }

    /// Partial update (PATCH).
    pub async fn update<B: Serialize + ?Sized>(
        &self,
        id: impl Display,
        patch: &B,
    ) -> GatewayResult<T> {
        self.gateway.patch(&self.item_path(id), patch).await
    }

    /// Full replacement (PUT).
    pub async fn replace<B: Serialize + ?Sized>(
        &self,
        id: impl Display,
        body: &B,
    ) -> GatewayResult<T> {
        self.gateway.put(&self.item_path(id), body).await
    }

    pub async fn delete(&self, id: impl Display) -> GatewayResult<()> {
        self.gateway.delete(&self.item_path(id)).await
    }
}
