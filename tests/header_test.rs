// P4 (round-trip header): assembling a job's header and decoding it back
// through decode_header must reproduce version/prev_hash/ntime/nbits
// exactly and the merkle root bit-for-bit, for both endianness conventions.

use gpucoord::core::header::{assemble_header, build_merkle_root, decode_header, Endianness};
use gpucoord::core::types::JobTemplate;

fn sample_job() -> JobTemplate {
    JobTemplate {
        job_id: "job1".to_string(),
        prev_hash: (0u8..32).collect(),
        coinbase1: vec![0xaa; 4],
        coinbase2: vec![0xbb; 4],
        merkle_branch: vec![[0x22u8; 32].to_vec(), [0x33u8; 32].to_vec()],
        version: 2u32.to_le_bytes().to_vec(),
        nbits: 0x1d00ffffu32.to_le_bytes().to_vec(),
        ntime: 0x5f5e1000u32.to_le_bytes().to_vec(),
        xnonce1: vec![0x01, 0x02, 0x03, 0x04],
        xnonce2_size: 4,
        height: 100,
        difficulty: 2.5,
        clean: false,
        merkle_root_override: None,
    }
}

#[test]
fn supported_endianness_round_trips_every_field_through_decode_header() {
    let job = sample_job();
    let xnonce2 = [0u8; 4];
    let header = assemble_header(&job, &xnonce2, None, Endianness::Supported).unwrap();
    let decoded = decode_header(&header, Endianness::Supported);

    assert_eq!(&decoded.version[..], job.version.as_slice());
    assert_eq!(&decoded.prev_hash[..], job.prev_hash.as_slice());
    assert_eq!(&decoded.ntime[..], job.ntime.as_slice());
    assert_eq!(&decoded.nbits[..], job.nbits.as_slice());
    assert_eq!(decoded.merkle_root, build_merkle_root(&job, &xnonce2));
}

#[test]
fn generic_endianness_round_trips_every_field_through_decode_header() {
    let job = sample_job();
    let xnonce2 = [3u8, 1, 4, 1];
    let header = assemble_header(&job, &xnonce2, None, Endianness::Generic).unwrap();
    let decoded = decode_header(&header, Endianness::Generic);

    assert_eq!(&decoded.version[..], job.version.as_slice());
    assert_eq!(&decoded.prev_hash[..], job.prev_hash.as_slice());
    assert_eq!(&decoded.ntime[..], job.ntime.as_slice());
    assert_eq!(&decoded.nbits[..], job.nbits.as_slice());
    assert_eq!(decoded.merkle_root, build_merkle_root(&job, &xnonce2));
}

#[test]
fn decoding_with_the_wrong_endianness_does_not_recover_the_original_fields() {
    let job = sample_job();
    let xnonce2 = [0u8; 4];
    let header = assemble_header(&job, &xnonce2, None, Endianness::Supported).unwrap();
    let decoded = decode_header(&header, Endianness::Generic);
    assert_ne!(&decoded.version[..], job.version.as_slice());
}

#[test]
fn ntime_override_replaces_the_job_template_value_but_nothing_else() {
    let job = sample_job();
    let xnonce2 = [0u8; 4];
    let header = assemble_header(&job, &xnonce2, Some(0x1234_5678), Endianness::Supported).unwrap();
    let decoded = decode_header(&header, Endianness::Supported);
    assert_eq!(decoded.ntime, 0x1234_5678u32.to_le_bytes());
    assert_eq!(&decoded.version[..], job.version.as_slice());
}

#[test]
fn getwork_style_job_skips_coinbase_folding_entirely() {
    let mut job = sample_job();
    let fixed_root = [0x77u8; 32];
    job.merkle_root_override = Some(fixed_root.to_vec());
    let root = build_merkle_root(&job, &[9, 9, 9, 9]);
    assert_eq!(root, fixed_root);
}
