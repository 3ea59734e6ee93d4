diesel::table! {
    workflow_run (step_run_id) {
        workflow_run_id -> Text,
        step_run_id -> Text,
        workflow_id -> Text,
        step_id -> Text,
        started_at -> Timestamptz,
        completed_at -> Nullable<Timestamptz>,
        status -> Text,
        workflow_state -> Jsonb,
        success_response -> Nullable<Jsonb>,
        error_response -> Nullable<Jsonb>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        created_by -> Nullable<Text>,
        updated_by -> Nullable<Text>,
    }
}

diesel::table! {
    workflow_definitions (workflow_id) {
        workflow_id -> Text,
        name -> Text,
        exit_keywords -> Jsonb,
        roles -> Jsonb,
        steps -> Jsonb,
    }
}

diesel::table! {
    mcp_tools (name) {
        name -> Text,
        description -> Nullable<Text>,
    }
}

diesel::table! {
    agent_config_store (agent_id, key) {
        agent_id -> Text,
        key -> Text,
        value -> Text,
    }
}
