//! Esquema Diesel declarado a mano. Reemplazable con `diesel print-schema`.

diesel::table! {
    simulation_nodes (id) {
        id -> Uuid,
        model_id -> Text,
        parameters -> Jsonb,
        input_concentrations -> Jsonb,
        previous_node_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    stage_results (node_id) {
        node_id -> Uuid,
        input_concentrations -> Jsonb,
        output_concentrations -> Jsonb,
        panels -> Jsonb,
        error -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(stage_results -> simulation_nodes (node_id));

diesel::allow_tables_to_appear_in_same_query!(
    simulation_nodes,
    stage_results,
);
