use serde::Serialize;

/// Request body of the consultation endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ConsultaRequest<'a> {
    pub consulta: &'a str,
}
