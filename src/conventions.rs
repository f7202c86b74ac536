//! Cross-service conventions: the closed event-type and source registries,
//! and the two subscription shapes every service reuses (wildcard audit,
//! cascade subscription).
//!
//! spec.md describes these registries only as "a closed set of ~160
//! dotted names" / "a closed set of service identifiers", without
//! enumerating them. The original Python client (`core/nats_client.py`)
//! enumerates both as `EventType`/`ServiceSource` — this module carries
//! that enumeration forward as a tagged sum per spec.md §9's design note,
//! generalising the teacher's `AggregateType`/`Operation` display-enum
//! pattern (`src/subjects.rs`) from 5/11 variants to the full registry.
//!
//! The wire format is unaffected: `Envelope::event_type`/`source` are
//! always plain `String`s. `EventType`/`SourceId` are a typed convenience
//! for callers who want to `match` instead of comparing strings, with an
//! `Unknown(String)` variant so a registry extension never breaks
//! decoding of envelopes already on the wire.

use std::fmt;
use std::str::FromStr;

macro_rules! dotted_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $variant:ident => $wire:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant, )+
            /// Anything outside the closed set above. Registry extensions
            /// land here until this enum is updated to match; decoding
            /// never fails because of it.
            Unknown(String),
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $( $name::$variant => write!(f, $wire), )+
                    $name::Unknown(s) => write!(f, "{s}"),
                }
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(match s {
                    $( $wire => $name::$variant, )+
                    other => $name::Unknown(other.to_string()),
                })
            }
        }

        impl $name {
            /// True if this value is in the closed registry (not `Unknown`).
            pub fn is_known(&self) -> bool {
                !matches!(self, $name::Unknown(_))
            }
        }
    };
}

dotted_enum! {
    /// Closed event-type registry (spec.md §6). New values are additions;
    /// existing ones are never repurposed.
    pub enum EventType {
        UserCreated => "user.created",
        UserUpdated => "user.updated",
        UserDeleted => "user.deleted",
        UserLoggedIn => "user.logged_in",
        UserLoggedOut => "user.logged_out",
        UserProfileUpdated => "user.profile_updated",

        DeviceAuthenticated => "device.authenticated",
        DeviceRegistered => "device.registered",
        DeviceOnline => "device.online",
        DeviceOffline => "device.offline",
        DeviceCommandSent => "device.command_sent",

        PaymentInitiated => "payment.initiated",
        PaymentCompleted => "payment.completed",
        PaymentFailed => "payment.failed",
        PaymentRefunded => "payment.refunded",
        SubscriptionCreated => "subscription.created",
        SubscriptionCanceled => "subscription.canceled",
        SubscriptionUpdated => "subscription.updated",
        SubscriptionActivated => "subscription.activated",
        SubscriptionExpired => "subscription.expired",
        SubscriptionRenewed => "subscription.renewed",

        OrgCreated => "organization.created",
        OrgUpdated => "organization.updated",
        OrgDeleted => "organization.deleted",
        OrgMemberAdded => "organization.member_added",
        OrgMemberRemoved => "organization.member_removed",

        FamilyResourceShared => "family.resource_shared",

        NotificationSent => "notification.sent",
        NotificationRead => "notification.read",

        FileUploaded => "file.uploaded",
        FileUploadedWithAi => "file.uploaded.with_ai",
        FileShared => "file.shared",
        FileDeleted => "file.deleted",
        FileIndexingRequested => "file.indexing.requested",
        FileIndexed => "file.indexed",
        FileIndexingFailed => "file.indexing.failed",

        OrderCreated => "order.created",
        OrderCompleted => "order.completed",
        OrderCanceled => "order.canceled",
        OrderFulfilled => "order.fulfilled",

        SessionStarted => "session.started",
        SessionEnded => "session.ended",
        SessionMessageSent => "session.message_sent",
        SessionTokensUsed => "session.tokens_used",

        WalletCreated => "wallet.created",
        WalletDeposited => "wallet.deposited",
        WalletWithdrawn => "wallet.withdrawn",
        WalletConsumed => "wallet.consumed",
        WalletTransferred => "wallet.transferred",
        WalletRefunded => "wallet.refunded",

        AlbumCreated => "album.created",
        AlbumUpdated => "album.updated",
        AlbumDeleted => "album.deleted",
        AlbumPhotoAdded => "album.photo.added",
        AlbumPhotoRemoved => "album.photo.removed",
        AlbumSynced => "album.synced",

        InvitationSent => "invitation.sent",
        InvitationAccepted => "invitation.accepted",
        InvitationDeclined => "invitation.declined",
        InvitationExpired => "invitation.expired",
        InvitationCancelled => "invitation.cancelled",

        TaskCreated => "task.created",
        TaskUpdated => "task.updated",
        TaskStarted => "task.started",
        TaskCompleted => "task.completed",
        TaskFailed => "task.failed",
        TaskCancelled => "task.cancelled",

        FirmwareUploaded => "firmware.uploaded",
        FirmwareDeleted => "firmware.deleted",
        CampaignCreated => "campaign.created",
        CampaignStarted => "campaign.started",
        UpdateStarted => "update.started",
        UpdateCompleted => "update.completed",
        UpdateFailed => "update.failed",
        UpdateCancelled => "update.cancelled",
        RollbackInitiated => "rollback.initiated",

        TelemetryDataReceived => "telemetry.data.received",
        AlertTriggered => "alert.triggered",
        AlertResolved => "alert.resolved",
        MetricDefined => "metric.defined",
        AlertRuleCreated => "alert.rule.created",

        MemoryCreated => "memory.created",
        MemoryUpdated => "memory.updated",
        MemoryDeleted => "memory.deleted",
        FactualMemoryStored => "memory.factual.stored",
        EpisodicMemoryStored => "memory.episodic.stored",
        ProceduralMemoryStored => "memory.procedural.stored",
        SemanticMemoryStored => "memory.semantic.stored",
        WorkingMemoryActivated => "memory.working.activated",
        SessionMemoryDeactivated => "memory.session.deactivated",

        UsageRecorded => "billing.usage.recorded",
        BillingProcessed => "billing.processed",
        BillingCalculated => "billing.calculated",
        InvoiceCreated => "billing.invoice.created",
        QuotaExceeded => "billing.quota.exceeded",
        BillingRecordCreated => "billing.record.created",

        ProductUsageRecorded => "product.usage.recorded",
        ProductAvailabilityChanged => "product.availability.changed",

        VaultSecretCreated => "vault.secret.created",
        VaultSecretAccessed => "vault.secret.accessed",
        VaultSecretUpdated => "vault.secret.updated",
        VaultSecretDeleted => "vault.secret.deleted",
        VaultSecretShared => "vault.secret.shared",
        VaultSecretRotated => "vault.secret.rotated",

        PermissionGranted => "authorization.permission.granted",
        PermissionRevoked => "authorization.permission.revoked",
        AccessChecked => "authorization.access.checked",
        AccessDenied => "authorization.access.denied",
        BulkPermissionsUpdated => "authorization.bulk.updated",

        EventStored => "event.stored",
        EventProcessedSuccess => "event.processed.success",
        EventProcessedFailed => "event.processed.failed",
        EventSubscriptionCreated => "event.subscription.created",
        EventReplayStarted => "event.replay.started",
        EventProjectionCreated => "event.projection.created",

        PhotoVersionCreated => "media.photo_version.created",
        PhotoMetadataUpdated => "media.photo_metadata.updated",
        MediaPlaylistCreated => "media.playlist.created",
        MediaPlaylistUpdated => "media.playlist.updated",
        MediaPlaylistDeleted => "media.playlist.deleted",
        RotationScheduleCreated => "media.rotation_schedule.created",
        RotationScheduleUpdated => "media.rotation_schedule.updated",
        PhotoCached => "media.photo.cached",

        CalendarEventCreated => "calendar.event.created",
        CalendarEventUpdated => "calendar.event.updated",
        CalendarEventDeleted => "calendar.event.deleted",

        ComplianceCheckPerformed => "compliance.check.performed",
        ComplianceViolationDetected => "compliance.violation.detected",
        ComplianceWarningIssued => "compliance.warning.issued",

        WeatherDataFetched => "weather.data.fetched",
        WeatherAlertCreated => "weather.alert.created",

        LocationUpdated => "location.updated",
        LocationBatchUpdated => "location.batch.updated",
        GeofenceCreated => "location.geofence.created",
        GeofenceUpdated => "location.geofence.updated",
        GeofenceDeleted => "location.geofence.deleted",
        GeofenceActivated => "location.geofence.activated",
        GeofenceDeactivated => "location.geofence.deactivated",
        GeofenceEntered => "location.geofence.entered",
        GeofenceExited => "location.geofence.exited",
        GeofenceDwell => "location.geofence.dwell",
        DeviceStartedMoving => "location.device.started_moving",
        DeviceStopped => "location.device.stopped",
        SignificantMovement => "location.significant_movement",
        LowBatteryAtLocation => "location.low_battery",
        PlaceCreated => "location.place.created",
        PlaceUpdated => "location.place.updated",
        PlaceDeleted => "location.place.deleted",
        RouteStarted => "location.route.started",
        RouteEnded => "location.route.ended",
    }
}

dotted_enum! {
    /// Closed source registry: one variant per deploy unit.
    pub enum SourceId {
        AuthService => "auth_service",
        UserService => "user_service",
        AccountService => "account_service",
        OrgService => "organization_service",
        PaymentService => "payment_service",
        OrderService => "order_service",
        SessionService => "session_service",
        DeviceService => "device_service",
        NotificationService => "notification_service",
        AuditService => "audit_service",
        AuthorizationService => "authorization_service",
        StorageService => "storage_service",
        WalletService => "wallet_service",
        AlbumService => "album_service",
        InvitationService => "invitation_service",
        TaskService => "task_service",
        OtaService => "ota_service",
        TelemetryService => "telemetry_service",
        MemoryService => "memory_service",
        BillingService => "billing_service",
        ProductService => "product_service",
        VaultService => "vault_service",
        EventService => "event_service",
        MediaService => "media_service",
        CalendarService => "calendar_service",
        ComplianceService => "compliance_service",
        WeatherService => "weather_service",
        LocationService => "location_service",
        Gateway => "api_gateway",
    }
}

/// Pattern for the wildcard-audit convention: a subscriber on this pattern
/// sees every published event, regardless of source or type. Handlers
/// registered against it must be idempotent and tolerate unknown `type`
/// values — redelivery and forward-compatible event types are both normal
/// here.
pub const WILDCARD_AUDIT_PATTERN: &str = ">";

/// Build the durable name for a cascade subscription: one independent
/// durable consumer per (event, consuming service) pair, so the broker
/// fans the event out to every consumer without a choreographer and a
/// failure in one consumer never blocks the others.
///
/// Example: `cascade_durable_name("user_deleted", "wallet_service")` =>
/// `"wallet_service-user_deleted-consumer"`.
pub fn cascade_durable_name(event_slug: &str, consuming_service: &str) -> String {
    format!("{consuming_service}-{event_slug}-consumer")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_event_type_round_trips_through_display_and_from_str() {
        let parsed: EventType = "payment.completed".parse().unwrap();
        assert_eq!(parsed, EventType::PaymentCompleted);
        assert_eq!(parsed.to_string(), "payment.completed");
        assert!(parsed.is_known());
    }

    #[test]
    fn unknown_event_type_is_preserved_not_rejected() {
        let parsed: EventType = "future.event.not_yet_known".parse().unwrap();
        assert_eq!(parsed, EventType::Unknown("future.event.not_yet_known".to_string()));
        assert_eq!(parsed.to_string(), "future.event.not_yet_known");
        assert!(!parsed.is_known());
    }

    #[test]
    fn three_token_event_type_round_trips() {
        let parsed: EventType = "memory.factual.stored".parse().unwrap();
        assert_eq!(parsed, EventType::FactualMemoryStored);
    }

    #[test]
    fn source_registry_round_trips() {
        let parsed: SourceId = "wallet_service".parse().unwrap();
        assert_eq!(parsed, SourceId::WalletService);
        assert!(parsed.is_known());
    }

    #[test]
    fn unknown_source_is_preserved() {
        let parsed: SourceId = "some_future_service".parse().unwrap();
        assert!(matches!(parsed, SourceId::Unknown(_)));
    }

    #[test]
    fn cascade_durable_name_is_per_service_and_event() {
        assert_eq!(
            cascade_durable_name("user_deleted", "wallet_service"),
            "wallet_service-user_deleted-consumer"
        );
        assert_eq!(
            cascade_durable_name("user_deleted", "calendar_service"),
            "calendar_service-user_deleted-consumer"
        );
    }
}
