// Mining Coordinator - Free and Open Source Software Statement
//
// This project, gpucoord, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/stratum/protocol.rs
//
// Stratum v1 wire message construction and parsing: mining.subscribe,
// mining.authorize, mining.submit outbound; mining.notify,
// mining.set_difficulty, mining.set_extranonce, mining.ping inbound.
// Modeled on the teacher's StratumProtocol (pool::protocol), generalized
// from the Tari login/submit pair to the full Bitcoin-style stratum v1
// handshake this spec requires.

use crate::core::types::JobTemplate;
use crate::error::ProtocolError;
use serde_json::{json, Value};

pub struct StratumProtocol;

impl StratumProtocol {
    pub fn subscribe_request(id: u64, agent: &str) -> Value {
        json!({
            "id": id,
            "method": "mining.subscribe",
            "params": [agent]
        })
    }

    pub fn authorize_request(id: u64, user: &str, pass: &str) -> Value {
        json!({
            "id": id,
            "method": "mining.authorize",
            "params": [user, pass]
        })
    }

    pub fn extranonce_subscribe_request(id: u64) -> Value {
        json!({
            "id": id,
            "method": "mining.extranonce.subscribe",
            "params": []
        })
    }

    /// Build a `mining.submit` request. `id` is expected to be 4 per the
    /// wire contract so the response can be matched without extra state
    /// (answer latency is measured from send to this response).
    pub fn submit_request(id: u64, user: &str, job_id: &str, xnonce2: &[u8], ntime: &[u8; 4], nonce: u32) -> Value {
        json!({
            "id": id,
            "method": "mining.submit",
            "params": [
                user,
                job_id,
                hex::encode(xnonce2),
                hex::encode(ntime),
                hex::encode(nonce.to_be_bytes()),
            ]
        })
    }

    pub fn to_line(json: &Value) -> String {
        format!("{json}\n")
    }
}

/// Parsed `mining.notify` params, ready to be combined with the session's
/// remembered xnonce1/xnonce2_size into a [`JobTemplate`].
pub struct NotifyParams {
    pub job_id: String,
    pub prev_hash: Vec<u8>,
    pub coinbase1: Vec<u8>,
    pub coinbase2: Vec<u8>,
    pub merkle_branch: Vec<Vec<u8>>,
    pub version: Vec<u8>,
    pub nbits: Vec<u8>,
    pub ntime: Vec<u8>,
    pub clean: bool,
}

pub fn parse_notify(params: &[Value]) -> Result<NotifyParams, ProtocolError> {
    if params.len() < 9 {
        return Err(ProtocolError::UnexpectedShape(format!(
            "mining.notify expected 9 params, got {}",
            params.len()
        )));
    }
    let as_str = |i: usize, name: &'static str| -> Result<String, ProtocolError> {
        params[i].as_str().map(str::to_string).ok_or(ProtocolError::MissingField(name))
    };
    let as_hex = |i: usize, name: &'static str| -> Result<Vec<u8>, ProtocolError> {
        let s = as_str(i, name)?;
        hex::decode(&s).map_err(|_| ProtocolError::UnexpectedShape(format!("field '{name}' is not valid hex")))
    };

    let job_id = as_str(0, "job_id")?;
    let prev_hash = as_hex(1, "prev_hash")?;
    let coinbase1 = as_hex(2, "coinbase1")?;
    let coinbase2 = as_hex(3, "coinbase2")?;
    let merkle_branch = params[4]
        .as_array()
        .ok_or(ProtocolError::MissingField("merkle_branch"))?
        .iter()
        .map(|v| v.as_str().and_then(|s| hex::decode(s).ok()))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| ProtocolError::UnexpectedShape("merkle_branch entry is not valid hex".to_string()))?;
    let version = as_hex(5, "version")?;
    let nbits = as_hex(6, "nbits")?;
    let ntime = as_hex(7, "ntime")?;
    let clean = params[8].as_bool().unwrap_or(false);

    Ok(NotifyParams { job_id, prev_hash, coinbase1, coinbase2, merkle_branch, version, nbits, ntime, clean })
}

/// Combine a session's xnonce1/xnonce2_size with freshly parsed notify
/// params into a full [`JobTemplate`].
pub fn notify_to_job(notify: NotifyParams, xnonce1: Vec<u8>, xnonce2_size: usize, height: u64, difficulty: f64) -> JobTemplate {
    JobTemplate {
        job_id: notify.job_id,
        prev_hash: notify.prev_hash,
        coinbase1: notify.coinbase1,
        coinbase2: notify.coinbase2,
        merkle_branch: notify.merkle_branch,
        version: notify.version,
        nbits: notify.nbits,
        ntime: notify.ntime,
        xnonce1,
        xnonce2_size,
        height,
        difficulty,
        clean: notify.clean,
        merkle_root_override: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_request_has_expected_shape() {
        let req = StratumProtocol::subscribe_request(1, "gpucoord/0.1.0");
        assert_eq!(req["method"], "mining.subscribe");
        assert_eq!(req["id"], 1);
    }

    #[test]
    fn submit_request_uses_id_four_by_convention() {
        let req = StratumProtocol::submit_request(4, "user", "job1", &[0, 0], &[0; 4], 7);
        assert_eq!(req["id"], 4);
        assert_eq!(req["method"], "mining.submit");
    }

    #[test]
    fn parse_notify_rejects_short_param_list() {
        let err = parse_notify(&[json!("job1")]).unwrap_err();
        matches!(err, ProtocolError::UnexpectedShape(_));
    }

    #[test]
    fn parse_notify_reads_all_fields() {
        let params = vec![
            json!("job1"),
            json!("00"),
            json!("aa"),
            json!("bb"),
            json!([]),
            json!("01000000"),
            json!("ffff001d"),
            json!("00000000"),
            json!(true),
        ];
        let notify = parse_notify(&params).unwrap();
        assert_eq!(notify.job_id, "job1");
        assert!(notify.clean);
        assert_eq!(notify.merkle_branch.len(), 0);
    }
}
