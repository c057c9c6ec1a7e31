//! Schema-qualified data access.
//!
//! [`DataAccess::with_scope`] is the only way to obtain an executor, and it
//! only accepts an [`AuthorizedContext`]. The executor copies the resolved
//! scope out of the context, so every partition it touches came from a
//! successful authorization decision for the current request.
//!
//! The executor also keeps the authorized `(action, resource)` pair, and each
//! mutation refuses to run unless it is exactly the pair it performs.
//!
//! Mutations publish a lifecycle event once the storage write has
//! succeeded. Publishing is fire-and-forget.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use carehub_auth::{Action, AuthorizedContext, ResourceScope, ResourceType};
use carehub_core::{EntityId, Organization, OrganizationId, PartitionId};
use carehub_events::{event_type, LifecycleEvent, LifecycleNotifier};

use crate::partition::PartitionStore;
use crate::records::{NewPatient, NewUser, PatientRecord, UserRecord};
use crate::registry::OrganizationRegistry;
use crate::DataAccessError;

/// Shared handles to the registry, the partition backend and the event sink.
#[derive(Clone)]
pub struct DataAccess {
    registry: Arc<dyn OrganizationRegistry>,
    partitions: Arc<dyn PartitionStore>,
    notifier: Arc<dyn LifecycleNotifier>,
}

impl DataAccess {
    pub fn new(
        registry: Arc<dyn OrganizationRegistry>,
        partitions: Arc<dyn PartitionStore>,
        notifier: Arc<dyn LifecycleNotifier>,
    ) -> Self {
        Self {
            registry,
            partitions,
            notifier,
        }
    }

    /// Bind an executor to the scope of an authorization decision.
    pub fn with_scope(&self, ctx: &AuthorizedContext) -> ScopedExecutor {
        ScopedExecutor {
            scope: ctx.scope().clone(),
            action: ctx.action().clone(),
            resource: ctx.resource().clone(),
            registry: self.registry.clone(),
            partitions: self.partitions.clone(),
            notifier: self.notifier.clone(),
        }
    }
}

/// Executor bound to exactly one resolved scope.
///
/// - `Organization` scope: reads and writes that organization's partition,
///   and reads or deletes that one registry entry.
/// - `AllOrganizations` scope: registry only (list, provision). Any tenant
///   partition request fails with [`DataAccessError::NoTenantPartition`].
pub struct ScopedExecutor {
    scope: ResourceScope,
    action: Action,
    resource: ResourceType,
    registry: Arc<dyn OrganizationRegistry>,
    partitions: Arc<dyn PartitionStore>,
    notifier: Arc<dyn LifecycleNotifier>,
}

impl ScopedExecutor {
    pub fn scope(&self) -> &ResourceScope {
        &self.scope
    }

    fn tenant(&self) -> Result<(OrganizationId, &PartitionId), DataAccessError> {
        match &self.scope {
            ResourceScope::Organization { id, partition } => Ok((*id, partition)),
            ResourceScope::AllOrganizations => Err(DataAccessError::NoTenantPartition),
        }
    }

    fn require(&self, action: Action, resource: ResourceType) -> Result<(), DataAccessError> {
        if self.action == action && self.resource == resource {
            Ok(())
        } else {
            Err(DataAccessError::OperationNotAuthorized { action, resource })
        }
    }

    fn notify(&self, kind: &str, organization_id: OrganizationId, entity_id: Option<EntityId>) {
        self.notifier
            .notify(LifecycleEvent::new(kind, organization_id, entity_id, Utc::now()));
    }

    /// Active organizations visible from this scope: all of them for the
    /// all-organizations scope, otherwise just the scoped one.
    pub async fn list_organizations(&self) -> Result<Vec<Organization>, DataAccessError> {
        match &self.scope {
            ResourceScope::AllOrganizations => self.registry.list_active().await,
            ResourceScope::Organization { .. } => {
                let org = self.organization().await?;
                Ok(vec![org])
            }
        }
    }

    /// The registry entry of the scoped organization.
    pub async fn organization(&self) -> Result<Organization, DataAccessError> {
        let (id, _) = self.tenant()?;
        match self.registry.find(id).await? {
            Some(org) if org.is_active() => Ok(org),
            _ => Err(DataAccessError::NotFound),
        }
    }

    /// Create a new organization with its own partition.
    ///
    /// The partition is created before the registry row is written, so the
    /// registry never maps an organization to a partition that does not
    /// exist.
    #[instrument(skip(self, name), err)]
    pub async fn provision_organization(
        &self,
        name: impl Into<String> + Send,
    ) -> Result<Organization, DataAccessError> {
        self.require(Action::CREATE, ResourceType::ORGANIZATION)?;
        if !matches!(self.scope, ResourceScope::AllOrganizations) {
            return Err(DataAccessError::RegistryScopeRequired);
        }

        let organization = Organization::provision(OrganizationId::new(), name, Utc::now());
        self.partitions.create_partition(&organization.partition).await?;
        self.registry.insert(organization.clone()).await?;

        tracing::info!(
            organization_id = %organization.id,
            partition = %organization.partition,
            "organization provisioned"
        );
        self.notify(event_type::ORGANIZATION_CREATED, organization.id, None);
        Ok(organization)
    }

    /// Soft-delete the scoped organization. Its partition is left in place.
    #[instrument(skip(self), err)]
    pub async fn soft_delete_organization(&self) -> Result<Organization, DataAccessError> {
        self.require(Action::DELETE, ResourceType::ORGANIZATION)?;
        let (id, _) = self.tenant()?;
        let deleted = self.registry.soft_delete(id, Utc::now()).await?;

        tracing::info!(organization_id = %id, "organization soft-deleted");
        self.notify(event_type::ORGANIZATION_DELETED, id, None);
        Ok(deleted)
    }

    pub async fn list_users(&self) -> Result<Vec<UserRecord>, DataAccessError> {
        let (_, partition) = self.tenant()?;
        self.partitions.list_users(partition).await
    }

    #[instrument(skip(self, new_user), err)]
    pub async fn create_user(&self, new_user: NewUser) -> Result<UserRecord, DataAccessError> {
        self.require(Action::CREATE, ResourceType::USER)?;
        let (org_id, partition) = self.tenant()?;
        let user = UserRecord {
            id: EntityId::new(),
            email: new_user.email,
            display_name: new_user.display_name,
            role: new_user.role,
            created_at: Utc::now(),
        };
        self.partitions.insert_user(partition, user.clone()).await?;

        self.notify(event_type::USER_CREATED, org_id, Some(user.id));
        Ok(user)
    }

    #[instrument(skip(self), err)]
    pub async fn delete_user(&self, id: EntityId) -> Result<(), DataAccessError> {
        self.require(Action::DELETE, ResourceType::USER)?;
        let (org_id, partition) = self.tenant()?;
        self.partitions.delete_user(partition, id).await?;

        self.notify(event_type::USER_DELETED, org_id, Some(id));
        Ok(())
    }

    pub async fn list_patients(&self) -> Result<Vec<PatientRecord>, DataAccessError> {
        let (_, partition) = self.tenant()?;
        self.partitions.list_patients(partition).await
    }

    #[instrument(skip(self, new_patient), err)]
    pub async fn create_patient(
        &self,
        new_patient: NewPatient,
    ) -> Result<PatientRecord, DataAccessError> {
        self.require(Action::CREATE, ResourceType::PATIENT)?;
        let (org_id, partition) = self.tenant()?;
        let patient = PatientRecord {
            id: EntityId::new(),
            full_name: new_patient.full_name,
            date_of_birth: new_patient.date_of_birth,
            created_at: Utc::now(),
        };
        self.partitions.insert_patient(partition, patient.clone()).await?;

        self.notify(event_type::PATIENT_CREATED, org_id, Some(patient.id));
        Ok(patient)
    }

    pub async fn get_patient(&self, id: EntityId) -> Result<PatientRecord, DataAccessError> {
        let (_, partition) = self.tenant()?;
        self.partitions
            .get_patient(partition, id)
            .await?
            .ok_or(DataAccessError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use chrono::DateTime;

    use carehub_auth::{
        Action, AuthorizationGate, CredentialVerifier, PermissionPolicy, Principal, PrincipalId,
        ResourceType, Role, VerificationError,
    };
    use carehub_events::{EventBus, InMemoryEventBus};

    use crate::partition::InMemoryPartitionStore;
    use crate::registry::InMemoryOrganizationRegistry;

    /// Maps opaque token strings straight to principals.
    struct TokenTable(HashMap<String, Principal>);

    impl CredentialVerifier for TokenTable {
        fn verify(
            &self,
            token: Option<&str>,
            _now: DateTime<Utc>,
        ) -> Result<Principal, VerificationError> {
            let token = token.ok_or(VerificationError::MissingToken)?;
            self.0
                .get(token)
                .cloned()
                .ok_or(VerificationError::InvalidSignature)
        }
    }

    struct Fixture {
        gate: AuthorizationGate,
        data: DataAccess,
        bus: Arc<InMemoryEventBus<LifecycleEvent>>,
        store: Arc<InMemoryPartitionStore>,
        org_a: Organization,
        org_b: Organization,
    }

    fn principal(role: Role, home: Option<&Organization>) -> Principal {
        Principal {
            principal_id: PrincipalId::new(),
            role,
            home_organization: home.map(|o| o.id),
            claimed_partition: home.map(|o| o.partition.clone()),
            scope_override: None,
        }
    }

    async fn fixture() -> Fixture {
        let org_a = Organization::provision(OrganizationId::new(), "Org A", Utc::now());
        let org_b = Organization::provision(OrganizationId::new(), "Org B", Utc::now());

        let registry = Arc::new(InMemoryOrganizationRegistry::with_organizations([
            org_a.clone(),
            org_b.clone(),
        ]));
        let store = Arc::new(InMemoryPartitionStore::new());
        store.create_partition(&org_a.partition).await.unwrap();
        store.create_partition(&org_b.partition).await.unwrap();

        let tokens = TokenTable(HashMap::from([
            ("super".to_string(), principal(Role::SuperAdmin, None)),
            ("admin-a".to_string(), principal(Role::OrgAdmin, Some(&org_a))),
            ("admin-b".to_string(), principal(Role::OrgAdmin, Some(&org_b))),
            ("nurse-a".to_string(), principal(Role::Nurse, Some(&org_a))),
        ]));

        let gate = AuthorizationGate::new(
            Arc::new(tokens),
            Arc::new(PermissionPolicy::builtin()),
            registry.clone(),
        );
        let bus = Arc::new(InMemoryEventBus::new());
        let data = DataAccess::new(registry, store.clone(), bus.clone());

        Fixture {
            gate,
            data,
            bus,
            store,
            org_a,
            org_b,
        }
    }

    async fn executor(
        f: &Fixture,
        token: &str,
        action: Action,
        resource: ResourceType,
        requested: Option<&str>,
    ) -> ScopedExecutor {
        let ctx = f
            .gate
            .authorize(Some(token), &action, &resource, requested)
            .await
            .unwrap();
        f.data.with_scope(&ctx)
    }

    #[tokio::test]
    async fn org_admin_writes_land_in_own_partition_only() {
        let f = fixture().await;
        let exec = executor(&f, "admin-a", Action::CREATE, ResourceType::USER, None).await;

        exec.create_user(NewUser {
            email: "n@a.test".to_string(),
            display_name: "Nurse".to_string(),
            role: Role::Nurse,
        })
        .await
        .unwrap();

        assert_eq!(f.store.list_users(&f.org_a.partition).await.unwrap().len(), 1);
        assert!(f.store.list_users(&f.org_b.partition).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn two_tenants_reading_concurrently_see_only_their_own_rows() {
        let f = fixture().await;

        let a = executor(&f, "admin-a", Action::CREATE, ResourceType::PATIENT, None).await;
        let b = executor(&f, "admin-b", Action::CREATE, ResourceType::PATIENT, None).await;
        a.create_patient(NewPatient {
            full_name: "Alice".to_string(),
            date_of_birth: None,
        })
        .await
        .unwrap();
        b.create_patient(NewPatient {
            full_name: "Bob".to_string(),
            date_of_birth: None,
        })
        .await
        .unwrap();

        let (list_a, list_b) = tokio::join!(a.list_patients(), b.list_patients());
        let names_a: Vec<_> = list_a.unwrap().into_iter().map(|p| p.full_name).collect();
        let names_b: Vec<_> = list_b.unwrap().into_iter().map(|p| p.full_name).collect();
        assert_eq!(names_a, vec!["Alice".to_string()]);
        assert_eq!(names_b, vec!["Bob".to_string()]);
    }

    #[tokio::test]
    async fn super_without_target_cannot_touch_a_tenant_partition() {
        let f = fixture().await;
        let exec = executor(&f, "super", Action::LIST, ResourceType::ORGANIZATION, None).await;
        assert_eq!(exec.scope(), &ResourceScope::AllOrganizations);

        assert_eq!(exec.list_users().await.unwrap_err(), DataAccessError::NoTenantPartition);
        assert_eq!(
            exec.list_patients().await.unwrap_err(),
            DataAccessError::NoTenantPartition
        );

        let orgs = exec.list_organizations().await.unwrap();
        assert_eq!(orgs.len(), 2);
    }

    #[tokio::test]
    async fn org_admin_lists_only_its_own_organization() {
        let f = fixture().await;
        let exec = executor(&f, "admin-a", Action::LIST, ResourceType::ORGANIZATION, None).await;

        let orgs = exec.list_organizations().await.unwrap();
        let ids: Vec<_> = orgs.into_iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![f.org_a.id]);
    }

    #[tokio::test]
    async fn super_with_target_reads_that_partition() {
        let f = fixture().await;
        let b_id = f.org_b.id.to_string();

        let writer = executor(&f, "admin-b", Action::CREATE, ResourceType::PATIENT, None).await;
        writer
            .create_patient(NewPatient {
                full_name: "Bob".to_string(),
                date_of_birth: None,
            })
            .await
            .unwrap();

        let exec = executor(&f, "super", Action::LIST, ResourceType::PATIENT, Some(&b_id)).await;
        assert_eq!(exec.list_patients().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn provisioning_requires_the_all_organizations_scope() {
        let f = fixture().await;
        let a_id = f.org_a.id.to_string();
        let exec = executor(
            &f,
            "super",
            Action::CREATE,
            ResourceType::ORGANIZATION,
            Some(&a_id),
        )
        .await;

        let err = exec.provision_organization("Nope").await.unwrap_err();
        assert_eq!(err, DataAccessError::RegistryScopeRequired);
    }

    #[tokio::test]
    async fn provisioning_creates_partition_then_notifies() {
        let f = fixture().await;
        let sub = f.bus.subscribe();
        let exec = executor(&f, "super", Action::CREATE, ResourceType::ORGANIZATION, None).await;

        let org = exec.provision_organization("Org C").await.unwrap();

        assert_eq!(org.partition, PartitionId::for_organization(org.id));
        assert_eq!(f.store.partition_count(), 3);
        assert!(f.store.list_users(&org.partition).await.unwrap().is_empty());

        let event = sub.try_recv().unwrap();
        assert_eq!(event.event_type(), event_type::ORGANIZATION_CREATED);
        assert_eq!(event.organization_id(), org.id);
        assert!(event.occurred_at() >= org.created_at);
    }

    #[tokio::test]
    async fn failed_mutation_publishes_nothing() {
        let f = fixture().await;
        let sub = f.bus.subscribe();
        let exec = executor(&f, "admin-a", Action::DELETE, ResourceType::USER, None).await;

        let err = exec.delete_user(EntityId::new()).await.unwrap_err();
        assert_eq!(err, DataAccessError::NotFound);
        assert!(sub.try_recv().is_err());
    }

    #[tokio::test]
    async fn soft_deleted_organization_stops_resolving() {
        let f = fixture().await;
        let a_id = f.org_a.id.to_string();

        let exec = executor(
            &f,
            "super",
            Action::DELETE,
            ResourceType::ORGANIZATION,
            Some(&a_id),
        )
        .await;
        let deleted = exec.soft_delete_organization().await.unwrap();
        assert!(deleted.is_deleted());

        let err = f
            .gate
            .authorize(Some("nurse-a"), &Action::READ, &ResourceType::PATIENT, None)
            .await
            .unwrap_err();
        assert!(matches!(err, carehub_auth::AuthzError::Forbidden(_)));
    }

    #[tokio::test]
    async fn mutations_require_the_authorized_operation() {
        let f = fixture().await;
        let a_id = f.org_a.id.to_string();
        let sub = f.bus.subscribe();

        let reader = executor(
            &f,
            "super",
            Action::READ,
            ResourceType::ORGANIZATION,
            Some(&a_id),
        )
        .await;
        assert_eq!(
            reader.soft_delete_organization().await.unwrap_err(),
            DataAccessError::OperationNotAuthorized {
                action: Action::DELETE,
                resource: ResourceType::ORGANIZATION,
            }
        );
        assert!(reader.organization().await.unwrap().is_active());

        let lister = executor(&f, "admin-a", Action::LIST, ResourceType::USER, None).await;
        let err = lister
            .create_user(NewUser {
                email: "x@a.test".to_string(),
                display_name: "X".to_string(),
                role: Role::Nurse,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DataAccessError::OperationNotAuthorized { .. }));
        assert!(f.store.list_users(&f.org_a.partition).await.unwrap().is_empty());

        assert!(sub.try_recv().is_err());
    }

    #[tokio::test]
    async fn missing_patient_is_not_found() {
        let f = fixture().await;
        let exec = executor(&f, "nurse-a", Action::READ, ResourceType::PATIENT, None).await;

        let err = exec.get_patient(EntityId::new()).await.unwrap_err();
        assert_eq!(err, DataAccessError::NotFound);
    }
}
