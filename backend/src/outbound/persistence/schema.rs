//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `migrations/` exactly. Instants are epoch
//! milliseconds and structured attributes are JSON text, so most columns
//! are `BigInt` or `Text`.

diesel::table! {
    /// Organizations, keyed by app and identifier.
    organizations (app_id, identifier) {
        app_id -> Text,
        identifier -> Text,
        name -> Text,
        description -> Nullable<Text>,
        created_on -> BigInt,
        modified_on -> BigInt,
        version -> BigInt,
    }
}

diesel::table! {
    /// Accounts. Enrollments live in `enrollments`.
    accounts (id) {
        id -> Text,
        app_id -> Text,
        org_membership -> Nullable<Text>,
        email -> Nullable<Text>,
        email_verified -> Bool,
        phone_number -> Nullable<Text>,
        phone_region -> Nullable<Text>,
        phone_verified -> Bool,
        synapse_user_id -> Nullable<Text>,
        health_code -> Nullable<Text>,
        first_name -> Nullable<Text>,
        last_name -> Nullable<Text>,
        attributes -> Nullable<Text>,
        password_hash -> Nullable<Text>,
        roles -> Nullable<Text>,
        data_groups -> Nullable<Text>,
        languages -> Nullable<Text>,
        status -> Text,
        time_zone -> Nullable<Text>,
        client_time_zone -> Nullable<Text>,
        note -> Nullable<Text>,
        created_on -> BigInt,
        modified_on -> BigInt,
        version -> BigInt,
        consent_signature_histories -> Nullable<Text>,
    }
}

diesel::table! {
    /// Study schedules.
    schedules (guid) {
        guid -> Text,
        app_id -> Text,
        owner_id -> Text,
        name -> Text,
        duration -> Text,
        published -> Bool,
        deleted -> Bool,
        sessions -> Nullable<Text>,
        client_data -> Nullable<Text>,
        created_on -> BigInt,
        modified_on -> BigInt,
        version -> BigInt,
    }
}

diesel::table! {
    /// Studies, keyed by app and identifier.
    studies (app_id, identifier) {
        app_id -> Text,
        identifier -> Text,
        name -> Text,
        details -> Nullable<Text>,
        phase -> Text,
        study_logo_url -> Nullable<Text>,
        color_scheme -> Nullable<Text>,
        institution_id -> Nullable<Text>,
        irb_name -> Nullable<Text>,
        irb_protocol_name -> Nullable<Text>,
        irb_protocol_id -> Nullable<Text>,
        irb_decision_on -> Nullable<Date>,
        irb_expires_on -> Nullable<Date>,
        irb_decision_type -> Nullable<Text>,
        keywords -> Nullable<Text>,
        diseases -> Nullable<Text>,
        study_designs -> Nullable<Text>,
        contacts -> Nullable<Text>,
        custom_events -> Nullable<Text>,
        exporter3_configuration -> Nullable<Text>,
        exporter3_enabled -> Bool,
        schedule_guid -> Nullable<Text>,
        created_by -> Nullable<Text>,
        launched_on -> Nullable<BigInt>,
        closeout_on -> Nullable<BigInt>,
        created_on -> BigInt,
        modified_on -> BigInt,
        deleted -> Bool,
        version -> BigInt,
    }
}

diesel::table! {
    /// Account membership in a study.
    enrollments (app_id, study_id, account_id) {
        app_id -> Text,
        study_id -> Text,
        account_id -> Text,
        external_id -> Nullable<Text>,
        enrolled_on -> Nullable<BigInt>,
        enrolled_by -> Nullable<Text>,
        withdrawn_on -> Nullable<BigInt>,
        withdrawn_by -> Nullable<Text>,
        withdrawal_note -> Nullable<Text>,
        consent_required -> Bool,
        note -> Nullable<Text>,
    }
}

diesel::table! {
    /// Sponsorship links between organizations and studies.
    organizations_studies (app_id, study_id, org_id) {
        app_id -> Text,
        study_id -> Text,
        org_id -> Text,
    }
}

diesel::table! {
    /// Legacy substudies.
    substudies (app_id, id) {
        app_id -> Text,
        id -> Text,
        name -> Text,
        deleted -> Bool,
        created_on -> BigInt,
        modified_on -> BigInt,
        version -> BigInt,
    }
}

diesel::table! {
    /// Account membership in a substudy.
    account_substudies (app_id, substudy_id, account_id) {
        app_id -> Text,
        substudy_id -> Text,
        account_id -> Text,
        external_id -> Nullable<Text>,
    }
}

diesel::table! {
    /// Assessment revisions. `(app_id, identifier, revision)` is unique.
    assessments (guid) {
        guid -> Text,
        app_id -> Text,
        identifier -> Text,
        revision -> BigInt,
        owner_id -> Text,
        title -> Text,
        summary -> Nullable<Text>,
        validation_status -> Nullable<Text>,
        normalization_status -> Nullable<Text>,
        os_name -> Text,
        original_guid -> Nullable<Text>,
        min_age -> Nullable<Integer>,
        max_age -> Nullable<Integer>,
        minutes_to_complete -> Nullable<Integer>,
        tags -> Nullable<Text>,
        labels -> Nullable<Text>,
        color_scheme -> Nullable<Text>,
        customization_fields -> Nullable<Text>,
        created_on -> BigInt,
        modified_on -> BigInt,
        deleted -> Bool,
        version -> BigInt,
    }
}

diesel::table! {
    /// Assessment configuration documents, one per assessment.
    assessment_configs (guid) {
        guid -> Text,
        config -> Nullable<Text>,
        created_on -> BigInt,
        modified_on -> BigInt,
        version -> BigInt,
    }
}

diesel::table! {
    /// External resources attached to an assessment identifier.
    assessment_resources (guid) {
        guid -> Text,
        app_id -> Text,
        assessment_id -> Text,
        title -> Text,
        category -> Text,
        url -> Text,
        format -> Nullable<Text>,
        date -> Nullable<Text>,
        description -> Nullable<Text>,
        contributors -> Nullable<Text>,
        creators -> Nullable<Text>,
        publishers -> Nullable<Text>,
        language -> Nullable<Text>,
        min_revision -> Nullable<BigInt>,
        max_revision -> Nullable<BigInt>,
        created_at_revision -> BigInt,
        created_on -> BigInt,
        modified_on -> BigInt,
        deleted -> Bool,
        version -> BigInt,
    }
}

diesel::table! {
    /// Survey versions, keyed by guid and creation instant.
    surveys (guid, created_on) {
        guid -> Text,
        created_on -> BigInt,
        app_id -> Text,
        identifier -> Text,
        name -> Text,
        copyright_notice -> Nullable<Text>,
        module_id -> Nullable<Text>,
        published -> Bool,
        deleted -> Bool,
        schema_revision -> Nullable<Integer>,
        elements -> Nullable<Text>,
        modified_on -> BigInt,
        version -> BigInt,
    }
}

diesel::table! {
    /// Message templates.
    templates (guid) {
        guid -> Text,
        app_id -> Text,
        template_type -> Text,
        name -> Text,
        description -> Nullable<Text>,
        published_created_on -> Nullable<BigInt>,
        deleted -> Bool,
        created_on -> BigInt,
        modified_on -> BigInt,
        version -> BigInt,
    }
}

diesel::table! {
    /// Immutable template revisions.
    template_revisions (template_guid, created_on) {
        template_guid -> Text,
        created_on -> BigInt,
        created_by -> Text,
        storage_path -> Text,
        subject -> Nullable<Text>,
        document_content -> Nullable<Text>,
        mime_type -> Text,
    }
}

diesel::table! {
    /// Study alerts.
    alerts (id) {
        id -> Text,
        created_on -> BigInt,
        app_id -> Text,
        study_id -> Text,
        user_id -> Text,
        category -> Text,
        data -> Nullable<Text>,
        read -> Bool,
    }
}

diesel::table! {
    /// Demographic owners, app-level when `study_id` is null.
    demographics_users (id) {
        id -> Text,
        app_id -> Text,
        study_id -> Nullable<Text>,
        user_id -> Text,
    }
}

diesel::table! {
    /// One demographic category answered by a demographic user.
    demographics (id) {
        id -> Text,
        demographic_user_id -> Text,
        category_name -> Text,
        multiple_select -> Bool,
        values -> Nullable<Text>,
        units -> Nullable<Text>,
    }
}
