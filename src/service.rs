//! Coordinates the category and payment stores for each client operation.
//!
//! Store calls are synchronous, so the service runs each one on tokio's
//! blocking pool and gives up on it once the query timeout has passed. A
//! timed out call is reported as [Error::StorageTimeout] and is not retried.
//! Its store is cancelled at the same time, so a late write never lands.

use std::time::Duration;

use crate::{
    Error,
    category::{Category, CategoryId, CategoryName, CategoryPatch, CategoryStore},
    db::{CancelToken, Cancellable},
    payment::{NewPayment, Payment, PaymentDraft, PaymentId, PaymentPatch, PaymentQuery, PaymentStore},
    sort::{PAYMENT_SORT_SAFELIST, ValidatedSort},
    validation::Violations,
};

/// How long a single store call may take before it is abandoned.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

/// Creates, reads, updates and deletes payments and categories while keeping
/// every payment linked to an existing category.
#[derive(Debug, Clone)]
pub struct RecordService<C, P> {
    categories: C,
    payments: P,
    query_timeout: Duration,
}

impl<C, P> RecordService<C, P>
where
    C: CategoryStore + Cancellable + Clone + Send + Sync + 'static,
    P: PaymentStore + Cancellable + Clone + Send + Sync + 'static,
{
    /// Create a service that bounds every store call by `query_timeout`.
    pub fn new(categories: C, payments: P, query_timeout: Duration) -> Self {
        Self {
            categories,
            payments,
            query_timeout,
        }
    }

    /// Create a payment, creating its category first if no category has that name yet.
    ///
    /// Nothing is written if `new_payment` fails validation.
    ///
    /// # Errors
    /// Returns [Error::Validation] for invalid input or a storage error.
    pub async fn create_payment(&self, new_payment: NewPayment) -> Result<Payment, Error> {
        new_payment.validate()?;

        let category_name = CategoryName::new_unchecked(new_payment.category_name.trim());
        let category = self.resolve_or_create_category(category_name).await?;

        let draft = PaymentDraft {
            name: new_payment.name,
            payment_type: new_payment.payment_type,
            comment: new_payment.comment,
            category_id: category.id,
            price: new_payment.price,
        };

        let payment = self
            .with_payments(move |store| store.create(&draft))
            .await?;
        tracing::debug!("created payment {} in category {}", payment.id, category.id);

        Ok(payment)
    }

    /// Get a payment by its ID.
    pub async fn get_payment(&self, id: PaymentId) -> Result<Payment, Error> {
        self.with_payments(move |store| store.get(id)).await
    }

    /// List the payments matching `query`, ordered by the sort token `sort`.
    ///
    /// # Errors
    /// Returns [Error::Validation] without querying the store if `sort` is not in
    /// [PAYMENT_SORT_SAFELIST].
    pub async fn list_payments(
        &self,
        query: PaymentQuery,
        sort: &str,
    ) -> Result<Vec<Payment>, Error> {
        let sort = ValidatedSort::validate(sort, PAYMENT_SORT_SAFELIST)?.resolve();

        self.with_payments(move |store| store.get_all(&query, &sort))
            .await
    }

    /// Apply the fields present in `patch` to the payment `id`.
    ///
    /// The payment is fetched, merged and written back in separate store calls.
    /// If it is deleted in between, the write fails with [Error::EditConflict].
    /// Concurrent edits of a payment that still exists are last-writer-wins.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if the payment does not exist,
    /// [Error::Validation] if the merged payment is invalid or `patch` names a
    /// category that does not exist, and [Error::EditConflict] as above.
    pub async fn update_payment(
        &self,
        id: PaymentId,
        patch: PaymentPatch,
    ) -> Result<Payment, Error> {
        let existing = self.get_payment(id).await?;

        // The stored name is authoritative for which category the payment is in.
        let current_category = self
            .category_by_name(existing.category_name.clone())
            .await?;
        let draft = PaymentDraft {
            category_id: current_category.id,
            ..existing.to_draft()
        };

        let requested_category_id = patch.category_id;
        let draft = draft.apply(patch);
        draft.validate()?;

        let category = match requested_category_id {
            Some(category_id) if category_id != current_category.id => {
                self.existing_category(category_id).await?
            }
            _ => current_category,
        };

        let stored_draft = draft.clone();
        self.with_payments(move |store| store.update(id, &stored_draft))
            .await?;
        tracing::debug!("updated payment {id}");

        Ok(Payment {
            id,
            name: draft.name,
            price: draft.price,
            date: existing.date,
            payment_type: draft.payment_type,
            comment: draft.comment,
            category_id: category.id,
            category_name: category.name,
        })
    }

    /// Delete a payment.
    pub async fn delete_payment(&self, id: PaymentId) -> Result<(), Error> {
        self.with_payments(move |store| store.delete(id)).await
    }

    /// Create a category.
    ///
    /// # Errors
    /// Returns [Error::Validation] if `name` is empty, or a storage error if the name is taken.
    pub async fn create_category(&self, name: &str) -> Result<Category, Error> {
        let name = CategoryName::new(name)?;

        self.with_categories(move |store| store.create(name)).await
    }

    /// Get a category by its ID.
    pub async fn get_category(&self, id: CategoryId) -> Result<Category, Error> {
        self.with_categories(move |store| store.get(id)).await
    }

    /// List every category.
    pub async fn list_categories(&self) -> Result<Vec<Category>, Error> {
        self.with_categories(|store| store.get_all()).await
    }

    /// Apply the fields present in `patch` to the category `id`.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if the category does not exist,
    /// [Error::Validation] if the new name is empty and [Error::EditConflict]
    /// if the category was deleted before the write.
    pub async fn update_category(
        &self,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> Result<Category, Error> {
        let existing = self.get_category(id).await?;

        let category = Category {
            id: existing.id,
            name: match patch.name {
                Some(name) => CategoryName::new(&name)?,
                None => existing.name,
            },
        };

        let stored_category = category.clone();
        self.with_categories(move |store| store.update(&stored_category))
            .await?;

        Ok(category)
    }

    /// Delete a category.
    ///
    /// # Errors
    /// Returns [Error::CategoryInUse] if payments still belong to the category.
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), Error> {
        self.with_categories(move |store| store.delete(id)).await
    }

    async fn resolve_or_create_category(&self, name: CategoryName) -> Result<Category, Error> {
        match self.category_by_name(name.clone()).await {
            Ok(category) => Ok(category),
            Err(Error::NotFound) => {
                tracing::debug!("creating category \"{name}\"");
                self.with_categories(move |store| store.create(name)).await
            }
            Err(error) => Err(error),
        }
    }

    async fn category_by_name(&self, name: CategoryName) -> Result<Category, Error> {
        self.with_categories(move |store| store.get_by_name(name.as_ref()))
            .await
    }

    /// Fetch the category a client asked to move a payment to.
    async fn existing_category(&self, id: CategoryId) -> Result<Category, Error> {
        match self.get_category(id).await {
            Err(Error::NotFound) => Err(Violations::single(
                "category_id",
                "must refer to an existing category",
            )
            .into()),
            result => result,
        }
    }

    async fn with_categories<T, F>(&self, operation: F) -> Result<T, Error>
    where
        F: FnOnce(&C) -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        let cancel = CancelToken::default();
        let store = self.categories.with_cancel_token(cancel.clone());
        self.bounded(cancel, move || operation(&store)).await
    }

    async fn with_payments<T, F>(&self, operation: F) -> Result<T, Error>
    where
        F: FnOnce(&P) -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        let cancel = CancelToken::default();
        let store = self.payments.with_cancel_token(cancel.clone());
        self.bounded(cancel, move || operation(&store)).await
    }

    /// Run `operation` on the blocking pool and cancel it via `cancel` if it
    /// does not finish within the query timeout.
    async fn bounded<T, F>(&self, cancel: CancelToken, operation: F) -> Result<T, Error>
    where
        F: FnOnce() -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        let task = tokio::task::spawn_blocking(operation);

        match tokio::time::timeout(self.query_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                tracing::error!("storage task failed: {join_error}");
                Err(Error::StorageTaskFailed(join_error.to_string()))
            }
            Err(_) => {
                cancel.cancel();
                tracing::error!(
                    "storage operation did not finish within {:?}",
                    self.query_timeout
                );
                Err(Error::StorageTimeout(self.query_timeout))
            }
        }
    }
}
