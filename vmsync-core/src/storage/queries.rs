//! SQL query builders.
//!
//! Generates SQL for the `servers` table. Execution belongs to the
//! hosting service; placeholders are positional (`$N`).

use super::models::ServerFilter;

/// Get the list of columns for the servers table.
///
/// Returns tuples of (column_name, parameter_placeholder), in the same
/// order as `ServerRow::values`.
pub fn get_server_columns() -> Vec<(&'static str, &'static str)> {
    vec![
        ("estado_start_stop", "$1"),
        ("ambiente", "$2"),
        ("app_name", "$3"),
        ("owner", "$4"),
        ("computer_name", "$5"),
        ("resource_group", "$6"),
        ("subscription", "$7"),
        ("location", "$8"),
        ("size", "$9"),
        ("schedule", "$10"),
        // Cloud-only fields
        ("power_state", "$11"),
        ("os_type", "$12"),
        ("provisioning_state", "$13"),
        ("vm_id", "$14"),
        ("created_time", "$15"),
        ("zones", "$16"),
        ("all_tags", "$17"),
        // Reconciliation stamp
        ("source", "$18"),
        ("last_updated", "$19"),
    ]
}

/// Build INSERT query for servers.
pub fn build_server_insert() -> String {
    let columns = get_server_columns();
    let col_names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
    let placeholders: Vec<&str> = columns.iter().map(|(_, ph)| *ph).collect();

    format!(
        "INSERT INTO servers ({}) VALUES ({})",
        col_names.join(", "),
        placeholders.join(", ")
    )
}

/// Clears the table ahead of a full replace. Run in the same transaction
/// as the inserts.
pub fn build_clear_servers() -> &'static str {
    "DELETE FROM servers"
}

/// Build the dashboard search query.
///
/// Returns the SQL plus its parameters in placeholder order.
pub fn build_server_search(filter: &ServerFilter) -> (String, Vec<String>) {
    let mut clauses = Vec::new();
    let mut params = Vec::new();

    if let Some(term) = filter.search_term() {
        params.push(format!("%{}%", term.to_lowercase()));
        let n = params.len();
        clauses.push(format!(
            "(LOWER(computer_name) LIKE ${n} OR LOWER(app_name) LIKE ${n} OR LOWER(owner) LIKE ${n})"
        ));
    }
    if let Some(env) = filter.environment() {
        params.push(env.to_string());
        clauses.push(format!("ambiente = ${}", params.len()));
    }
    if let Some(app) = filter.app_name() {
        params.push(app.to_string());
        clauses.push(format!("app_name = ${}", params.len()));
    }
    if let Some(status) = filter.status {
        params.push(status.label().to_string());
        clauses.push(format!("estado_start_stop = ${}", params.len()));
    }
    if let Some(owner) = filter.owner() {
        params.push(owner.to_string());
        clauses.push(format!("owner = ${}", params.len()));
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    (
        format!(
            "SELECT {} FROM servers{} ORDER BY computer_name",
            get_server_columns()
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join(", "),
            where_clause
        ),
        params,
    )
}

/// Headline counters by status label.
pub fn build_stats_query() -> &'static str {
    r#"
    SELECT
        COUNT(*) AS total,
        SUM(CASE WHEN estado_start_stop = 'Activo' THEN 1 ELSE 0 END) AS active,
        SUM(CASE WHEN estado_start_stop = 'Agendamento em progresso' THEN 1 ELSE 0 END) AS scheduled,
        SUM(CASE WHEN estado_start_stop = 'Inactivo' THEN 1 ELSE 0 END) AS inactive
    FROM servers
    "#
}

/// Active servers per environment.
pub fn build_environment_breakdown_query() -> &'static str {
    r#"
    SELECT ambiente, COUNT(*) AS count
    FROM servers
    WHERE estado_start_stop = 'Activo'
    GROUP BY ambiente
    ORDER BY ambiente
    "#
}
