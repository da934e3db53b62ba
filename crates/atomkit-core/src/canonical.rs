//! Canonical CBOR encoding for content hashing.
//!
//! This module implements RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//!
//! Particle identity and atom hashes are Blake3 digests of these bytes, so the
//! same content must produce identical bytes on every platform. Structs are
//! encoded as maps with small integer keys; 256-bit amounts as 32 big-endian
//! bytes; addresses as their 37-byte encoded form.

use ciborium::value::Value;
use primitive_types::U256;
use std::collections::BTreeMap;

use crate::address::Address;
use crate::atom::Atom;
use crate::group::ParticleGroup;
use crate::particle::{Particle, SpunParticle, TokenPermissions};
use crate::rri::Rri;

/// Field keys shared by all particle maps. Keys 0-23 encode as single bytes.
mod keys {
    pub const KIND: u64 = 0;
    pub const RRI: u64 = 1;
    pub const ADDRESS: u64 = 2;
    pub const NAME: u64 = 3;
    pub const DESCRIPTION: u64 = 4;
    pub const GRANULARITY: u64 = 5;
    pub const ICON_URL: u64 = 6;
    pub const URL: u64 = 7;
    pub const PERMISSIONS: u64 = 8;
    pub const SUPPLY: u64 = 9;
    pub const AMOUNT: u64 = 10;
    pub const NONCE: u64 = 11;
    pub const FROM: u64 = 12;
    pub const TO: u64 = 13;
    pub const BYTES: u64 = 14;
    pub const METADATA: u64 = 15;

    pub const PARTICLES: u64 = 0;
    pub const GROUP_METADATA: u64 = 1;

    pub const GROUPS: u64 = 0;
    pub const ATOM_METADATA: u64 = 1;
}

/// Canonical bytes of a particle.
pub fn particle_bytes(particle: &Particle) -> Vec<u8> {
    encode_cbor_value_canonical(&particle_to_cbor_value(particle))
}

/// Canonical bytes of a whole atom.
pub fn atom_bytes(atom: &Atom) -> Vec<u8> {
    encode_cbor_value_canonical(&atom_to_cbor_value(atom))
}

fn int(n: u64) -> Value {
    Value::Integer(n.into())
}

fn entry(key: u64, value: Value) -> (Value, Value) {
    (int(key), value)
}

fn u256_value(n: U256) -> Value {
    let mut buf = [0u8; 32];
    n.to_big_endian(&mut buf);
    Value::Bytes(buf.to_vec())
}

fn address_value(address: &Address) -> Value {
    Value::Bytes(address.to_bytes().to_vec())
}

fn rri_value(rri: &Rri) -> Value {
    Value::Array(vec![address_value(rri.address()), Value::Text(rri.name().to_string())])
}

fn optional_text(s: &Option<String>) -> Value {
    match s {
        Some(s) => Value::Text(s.clone()),
        None => Value::Null,
    }
}

fn permissions_value(permissions: &TokenPermissions) -> Value {
    Value::Array(vec![
        int(permissions.mint.to_u8().into()),
        int(permissions.burn.to_u8().into()),
    ])
}

fn string_map(map: &BTreeMap<String, String>) -> Value {
    Value::Map(
        map.iter()
            .map(|(k, v)| (Value::Text(k.clone()), Value::Text(v.clone())))
            .collect(),
    )
}

/// Convert a particle to a CBOR map with integer keys.
fn particle_to_cbor_value(particle: &Particle) -> Value {
    let mut entries = vec![entry(keys::KIND, int(particle.kind().to_u8().into()))];

    match particle {
        Particle::Rri(p) => {
            entries.push(entry(keys::RRI, rri_value(&p.rri)));
            entries.push(entry(keys::NONCE, Value::Integer(p.nonce.into())));
        }
        Particle::MutableSupplyTokenDefinition(p) => {
            entries.push(entry(keys::RRI, rri_value(&p.rri)));
            entries.push(entry(keys::NAME, Value::Text(p.name.clone())));
            entries.push(entry(keys::DESCRIPTION, Value::Text(p.description.clone())));
            entries.push(entry(keys::GRANULARITY, u256_value(p.granularity.value())));
            entries.push(entry(keys::ICON_URL, optional_text(&p.icon_url)));
            entries.push(entry(keys::URL, optional_text(&p.url)));
            entries.push(entry(keys::PERMISSIONS, permissions_value(&p.permissions)));
        }
        Particle::FixedSupplyTokenDefinition(p) => {
            entries.push(entry(keys::RRI, rri_value(&p.rri)));
            entries.push(entry(keys::NAME, Value::Text(p.name.clone())));
            entries.push(entry(keys::DESCRIPTION, Value::Text(p.description.clone())));
            entries.push(entry(keys::GRANULARITY, u256_value(p.granularity.value())));
            entries.push(entry(keys::ICON_URL, optional_text(&p.icon_url)));
            entries.push(entry(keys::URL, optional_text(&p.url)));
            entries.push(entry(keys::SUPPLY, u256_value(p.supply.value())));
        }
        Particle::UnallocatedTokens(p) => {
            entries.push(entry(keys::RRI, rri_value(&p.token)));
            entries.push(entry(keys::AMOUNT, u256_value(p.amount.value())));
            entries.push(entry(keys::GRANULARITY, u256_value(p.granularity.value())));
            entries.push(entry(keys::PERMISSIONS, permissions_value(&p.permissions)));
            entries.push(entry(keys::NONCE, Value::Integer(p.nonce.into())));
        }
        Particle::TransferrableTokens(p) => {
            entries.push(entry(keys::ADDRESS, address_value(&p.address)));
            entries.push(entry(keys::RRI, rri_value(&p.token)));
            entries.push(entry(keys::AMOUNT, u256_value(p.amount.value())));
            entries.push(entry(keys::GRANULARITY, u256_value(p.granularity.value())));
            entries.push(entry(keys::PERMISSIONS, permissions_value(&p.permissions)));
            entries.push(entry(keys::NONCE, Value::Integer(p.nonce.into())));
        }
        Particle::Unique(p) => {
            entries.push(entry(keys::ADDRESS, address_value(&p.address)));
            entries.push(entry(keys::NAME, Value::Text(p.name.clone())));
            entries.push(entry(keys::NONCE, Value::Integer(p.nonce.into())));
        }
        Particle::Message(p) => {
            entries.push(entry(keys::FROM, address_value(&p.from)));
            entries.push(entry(keys::TO, address_value(&p.to)));
            entries.push(entry(keys::BYTES, Value::Bytes(p.bytes.to_vec())));
            entries.push(entry(keys::METADATA, string_map(&p.metadata)));
            entries.push(entry(keys::NONCE, Value::Integer(p.nonce.into())));
        }
    }

    Value::Map(entries)
}

fn spun_to_cbor_value(spun: &SpunParticle) -> Value {
    Value::Array(vec![
        Value::Integer(spun.spin.to_i8().into()),
        particle_to_cbor_value(&spun.particle),
    ])
}

fn group_to_cbor_value(group: &ParticleGroup) -> Value {
    let particles = group.particles().iter().map(spun_to_cbor_value).collect();
    Value::Map(vec![
        entry(keys::PARTICLES, Value::Array(particles)),
        entry(keys::GROUP_METADATA, string_map(group.metadata())),
    ])
}

fn atom_to_cbor_value(atom: &Atom) -> Value {
    let groups = atom.groups().iter().map(group_to_cbor_value).collect();
    Value::Map(vec![
        entry(keys::GROUPS, Value::Array(groups)),
        entry(keys::ATOM_METADATA, string_map(atom.metadata())),
    ])
}

/// Encode a CBOR Value to canonical bytes.
fn encode_cbor_value_canonical(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Recursively encode a CBOR value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::Text(s) => encode_text(buf, s),
        Value::Array(arr) => encode_array(buf, arr),
        Value::Map(entries) => encode_map_canonical(buf, entries),
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        // Never produced by the converters above; encoded for completeness.
        Value::Float(f) => {
            buf.push(0xfb);
            buf.extend_from_slice(&f.to_be_bytes());
        }
        Value::Tag(tag, inner) => {
            encode_uint(buf, 6, *tag);
            encode_value_to(buf, inner);
        }
        _ => buf.push(0xf7),
    }
}

/// Encode a CBOR integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, i: ciborium::value::Integer) {
    let n: i128 = i.into();

    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        let abs = (-1 - n) as u64;
        encode_uint(buf, 1, abs);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffffffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

fn encode_array(buf: &mut Vec<u8>, arr: &[Value]) {
    encode_uint(buf, 4, arr.len() as u64);
    for item in arr {
        encode_value_to(buf, item);
    }
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison.
fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) {
    let mut key_value_pairs: Vec<(Vec<u8>, &Value)> = entries
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::new();
            encode_value_to(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    key_value_pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, key_value_pairs.len() as u64);
    for (key_bytes, value) in key_value_pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}
