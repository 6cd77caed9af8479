//! Backend calls. Every function returns `ApiResult` so views decide how a
//! failure is shown; none of them retries.

use gloo_net::http::{Request, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use siam_shared::api::{
    self, AUTH_IDENTIFY_PATH, AUTH_VERIFY_PATH, CLIENT_CONFIG_PATH, COMPANY_INFO_PATH,
    CONTACTOS_PATH, CompanyInfoResponse, ContactPayload, ErrorBody, IdentifyRequest,
    IdentifyResponse, NOTARY_REQUESTS_PATH, NOTARY_SEARCH_PATH, NotaryOffice, PERU_BOUNDARY_PATH,
    PUBLIC_IP_URL, Persona, PublicIpResponse, SOLICITUD_ALTA_PATH, SolicitudAltaPayload,
    SuspendRequest, TERRITORY_PATH, VerifyRequest, VerifyResponse, WorkerIdentity,
};
use siam_shared::notary::{self, NotaryRequest};
use siam_shared::{
    ApiError, ApiResult, AuthBackend, ClientConfig, CompanyProfile, Geometry, TerritorySets,
    aggregate_json,
};

fn network(e: gloo_net::Error) -> ApiError {
    ApiError::Network(e.to_string())
}

async fn decode<T: DeserializeOwned>(resp: Response) -> ApiResult<T> {
    resp.json::<T>()
        .await
        .map_err(|e| ApiError::Parse(e.to_string()))
}

/// Non-2xx answer as `ApiError::Http`, carrying the backend's message if any.
async fn http_error(resp: Response) -> ApiError {
    let status = resp.status();
    let message = resp
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.text().map(str::to_owned))
        .unwrap_or_default();
    ApiError::Http { status, message }
}

async fn get_json<T: DeserializeOwned>(url: &str) -> ApiResult<T> {
    let resp = Request::get(url).send().await.map_err(network)?;
    if !resp.ok() {
        return Err(http_error(resp).await);
    }
    decode(resp).await
}

pub async fn fetch_client_config() -> ApiResult<ClientConfig> {
    get_json(CLIENT_CONFIG_PATH).await
}

pub async fn fetch_company(ide_eje: i64) -> ApiResult<CompanyProfile> {
    let resp: CompanyInfoResponse = get_json(COMPANY_INFO_PATH).await?;
    siam_shared::company::select_company(&resp, ide_eje)
}

/// Territory rows aggregated into region tiers. A body that is not an
/// array aggregates to empty sets.
pub async fn fetch_territory() -> ApiResult<TerritorySets> {
    let payload: Value = get_json(TERRITORY_PATH).await?;
    Ok(aggregate_json(&payload))
}

pub async fn fetch_peru_boundary() -> ApiResult<Geometry> {
    let payload: Value = get_json(PERU_BOUNDARY_PATH).await?;
    Ok(Geometry::from_value(&payload)?)
}

pub async fn fetch_public_ip() -> ApiResult<String> {
    let resp: PublicIpResponse = get_json(PUBLIC_IP_URL).await?;
    Ok(resp.ip)
}

/// `identify`/`verify` over HTTP.
#[derive(Clone, Copy, Default)]
pub struct HttpAuthBackend;

impl AuthBackend for HttpAuthBackend {
    async fn identify(&self, username: &str) -> ApiResult<Option<WorkerIdentity>> {
        let resp = Request::post(AUTH_IDENTIFY_PATH)
            .json(&IdentifyRequest {
                username: username.to_owned(),
            })
            .map_err(network)?
            .send()
            .await
            .map_err(network)?;
        // Unknown users come back as `{success:false}`, sometimes with a 4xx.
        let status = resp.status();
        match decode::<IdentifyResponse>(resp).await {
            Ok(body) if body.success => Ok(body.data),
            Ok(_) => Ok(None),
            Err(_) if status >= 400 => Err(ApiError::Http {
                status,
                message: String::new(),
            }),
            Err(e) => Err(e),
        }
    }

    async fn reference_digest(&self, line_id: i64) -> ApiResult<Option<String>> {
        let resp = Request::post(AUTH_VERIFY_PATH)
            .json(&VerifyRequest { nlineno: line_id })
            .map_err(network)?
            .send()
            .await
            .map_err(network)?;
        let body: VerifyResponse = decode(resp).await?;
        Ok(body.ccpassword.filter(|_| body.success))
    }
}

pub async fn fetch_notary_requests() -> ApiResult<Vec<NotaryRequest>> {
    let payload: Value = get_json(NOTARY_REQUESTS_PATH).await?;
    Ok(notary::parse_requests(&payload))
}

pub async fn approve_request(nro_sol: i64) -> ApiResult<()> {
    let resp = Request::put(&api::approve_request_path(nro_sol))
        .send()
        .await
        .map_err(network)?;
    if !resp.ok() {
        return Err(http_error(resp).await);
    }
    Ok(())
}

pub async fn set_suspension(nro_sol: i64, flg_sus: i64) -> ApiResult<()> {
    let resp = Request::put(&api::suspend_request_path(nro_sol))
        .json(&SuspendRequest { flg_sus })
        .map_err(network)?
        .send()
        .await
        .map_err(network)?;
    if !resp.ok() {
        return Err(http_error(resp).await);
    }
    Ok(())
}

/// Person by DNI. Any non-2xx answer is reported as not found.
pub async fn fetch_persona(dni: &str) -> ApiResult<Persona> {
    let dni = notary::validate_dni(dni)?;
    let resp = Request::get(&api::persona_path(dni))
        .send()
        .await
        .map_err(network)?;
    if !resp.ok() {
        return Err(ApiError::NotFound(
            "No se encontró información para este DNI.".to_owned(),
        ));
    }
    decode(resp).await
}

pub async fn search_notaries(query: &str) -> ApiResult<Vec<NotaryOffice>> {
    let resp = Request::get(NOTARY_SEARCH_PATH)
        .query([("q", query)])
        .send()
        .await
        .map_err(network)?;
    if !resp.ok() {
        return Err(http_error(resp).await);
    }
    let payload: Value = decode(resp).await?;
    let Value::Array(rows) = payload else {
        return Ok(Vec::new());
    };
    Ok(rows
        .into_iter()
        .filter_map(|row| serde_json::from_value(row).ok())
        .collect())
}

/// Submit an onboarding request; `Ok` carries the new request number.
pub async fn submit_onboarding(payload: &SolicitudAltaPayload) -> ApiResult<i64> {
    let resp = Request::post(SOLICITUD_ALTA_PATH)
        .json(payload)
        .map_err(network)?
        .send()
        .await
        .map_err(network)?;
    let status = resp.status();
    let body = resp.json::<Value>().await.unwrap_or(Value::Null);
    notary::interpret_submission(status, &body)
}

pub async fn submit_contact(payload: &ContactPayload) -> ApiResult<()> {
    let resp = Request::post(CONTACTOS_PATH)
        .json(payload)
        .map_err(network)?
        .send()
        .await
        .map_err(network)?;
    if !resp.ok() {
        return Err(http_error(resp).await);
    }
    Ok(())
}
