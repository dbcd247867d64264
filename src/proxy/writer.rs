//! Output writers for ranked records
//!
//! Three renditions are produced: the plain descriptor list, a Clash-style
//! bundle document and a JSON dump of every record field.

use crate::proxy::models::{Network, ProxyKind, ProxyRecord};
use crate::Result;
use log::{info, warn};
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the select group every proxy is listed in
pub const PROXY_GROUP: &str = "Proxy";

/// Destination files for one pipeline run
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
    plain_text: String,
    clash: String,
    json: String,
}

impl OutputWriter {
    pub fn new(dir: impl Into<PathBuf>, plain_text: &str, clash: &str, json: &str) -> Self {
        Self {
            dir: dir.into(),
            plain_text: plain_text.to_string(),
            clash: clash.to_string(),
            json: json.to_string(),
        }
    }

    pub fn plain_text_path(&self) -> PathBuf {
        self.dir.join(&self.plain_text)
    }

    pub fn clash_path(&self) -> PathBuf {
        self.dir.join(&self.clash)
    }

    pub fn json_path(&self) -> PathBuf {
        self.dir.join(&self.json)
    }

    /// Write every rendition, creating the output directory if needed
    pub fn write_all(&self, records: &[ProxyRecord]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        write_plain_text(records, self.plain_text_path())?;
        write_clash_yaml(records, self.clash_path())?;
        write_json(records, self.json_path())?;
        Ok(())
    }
}

/// One descriptor per line
pub fn write_plain_text<P: AsRef<Path>>(records: &[ProxyRecord], path: P) -> Result<()> {
    let mut content = String::new();
    for record in records {
        content.push_str(&record.raw);
        content.push('\n');
    }
    fs::write(path.as_ref(), content)?;
    info!("Wrote {} proxies to {}", records.len(), path.as_ref().display());
    Ok(())
}

/// Write the Clash bundle, returning how many proxies it lists
pub fn write_clash_yaml<P: AsRef<Path>>(records: &[ProxyRecord], path: P) -> Result<usize> {
    let (document, count) = clash_document(records);
    fs::write(path.as_ref(), serde_yaml::to_string(&document)?)?;
    info!("Wrote {} proxies to {}", count, path.as_ref().display());
    Ok(count)
}

pub fn write_json<P: AsRef<Path>>(records: &[ProxyRecord], path: P) -> Result<()> {
    fs::write(path.as_ref(), serde_json::to_string_pretty(records)?)?;
    info!("Wrote {} proxies to {}", records.len(), path.as_ref().display());
    Ok(())
}

/// Build the bundle document and the number of proxies in it
pub fn clash_document(records: &[ProxyRecord]) -> (Value, usize) {
    let mut used = HashSet::new();
    let mut proxies = Vec::with_capacity(records.len());
    let mut names = vec![Value::from("DIRECT")];

    for record in records {
        let Some(mut proxy) = clash_proxy(record) else {
            warn!("{} has no bundle representation, skipping", record);
            continue;
        };
        let name = unique_name(&record.name, &mut used);
        proxy.insert(Value::from("name"), Value::from(name.clone()));
        names.push(Value::from(name));
        proxies.push(Value::Mapping(proxy));
    }

    let count = proxies.len();
    let mut group = Mapping::new();
    group.insert(Value::from("name"), Value::from(PROXY_GROUP));
    group.insert(Value::from("type"), Value::from("select"));
    group.insert(Value::from("proxies"), Value::Sequence(names));

    let mut document = Mapping::new();
    document.insert(Value::from("proxies"), Value::Sequence(proxies));
    document.insert(
        Value::from("proxy-groups"),
        Value::Sequence(vec![Value::Mapping(group)]),
    );
    document.insert(
        Value::from("rules"),
        Value::Sequence(vec![Value::from(format!("MATCH,{}", PROXY_GROUP))]),
    );
    (Value::Mapping(document), count)
}

/// Suffix repeated names so every bundle entry is addressable
fn unique_name(name: &str, used: &mut HashSet<String>) -> String {
    let mut candidate = name.to_string();
    let mut n = 2;
    while !used.insert(candidate.clone()) {
        candidate = format!("{} {}", name, n);
        n += 1;
    }
    candidate
}

fn clash_proxy(record: &ProxyRecord) -> Option<Mapping> {
    let kind = match record.kind {
        ProxyKind::Shadowsocks => "ss",
        ProxyKind::Vmess => "vmess",
        ProxyKind::Vless => "vless",
        ProxyKind::Trojan => "trojan",
        ProxyKind::Hysteria2 => "hysteria2",
        ProxyKind::Tuic => "tuic",
        ProxyKind::Http | ProxyKind::Https => "http",
        ProxyKind::Socks5 => "socks5",
        ProxyKind::Socks4 => return None,
    };

    let mut proxy = Mapping::new();
    put(&mut proxy, "type", Some(kind));
    put(&mut proxy, "server", Some(record.host.as_str()));
    proxy.insert(Value::from("port"), Value::from(record.port));

    match record.kind {
        ProxyKind::Shadowsocks => {
            put(&mut proxy, "cipher", record.cipher.as_deref());
            put(&mut proxy, "password", record.password.as_deref());
        }
        ProxyKind::Vmess => {
            put(&mut proxy, "uuid", record.uuid.as_deref());
            proxy.insert(Value::from("alterId"), Value::from(record.alter_id.unwrap_or(0)));
            put(&mut proxy, "cipher", record.cipher.as_deref());
            proxy.insert(Value::from("tls"), Value::from(record.tls));
            put(&mut proxy, "servername", record.sni.as_deref());
            transport(&mut proxy, record);
        }
        ProxyKind::Vless => {
            put(&mut proxy, "uuid", record.uuid.as_deref());
            proxy.insert(Value::from("tls"), Value::from(record.tls));
            put(&mut proxy, "flow", record.flow.as_deref());
            put(&mut proxy, "servername", record.sni.as_deref());
            transport(&mut proxy, record);
        }
        ProxyKind::Trojan => {
            put(&mut proxy, "password", record.password.as_deref());
            put(&mut proxy, "sni", record.sni.as_deref());
            transport(&mut proxy, record);
        }
        ProxyKind::Hysteria2 => {
            put(&mut proxy, "password", record.password.as_deref());
            put(&mut proxy, "sni", record.sni.as_deref());
            put(&mut proxy, "obfs", record.obfs.as_deref());
            put(&mut proxy, "obfs-password", record.obfs_password.as_deref());
        }
        ProxyKind::Tuic => {
            put(&mut proxy, "uuid", record.uuid.as_deref());
            put(&mut proxy, "password", record.password.as_deref());
            if let Some(version) = record.tuic_version {
                proxy.insert(Value::from("version"), Value::from(version));
            }
            put(&mut proxy, "udp-relay-mode", record.udp_relay_mode.as_deref());
            put(&mut proxy, "congestion-controller", record.congestion_controller.as_deref());
            if !record.alpn.is_empty() {
                let alpn = record.alpn.iter().map(|a| Value::from(a.as_str())).collect();
                proxy.insert(Value::from("alpn"), Value::Sequence(alpn));
            }
            put(&mut proxy, "sni", record.sni.as_deref());
            if let Some(disable_sni) = record.disable_sni {
                proxy.insert(Value::from("disable-sni"), Value::from(disable_sni));
            }
        }
        ProxyKind::Http | ProxyKind::Https | ProxyKind::Socks5 => {
            put(&mut proxy, "username", record.username.as_deref());
            put(&mut proxy, "password", record.password.as_deref());
            if record.kind == ProxyKind::Https {
                proxy.insert(Value::from("tls"), Value::from(true));
            }
        }
        ProxyKind::Socks4 => {}
    }

    if let Some(skip) = record.skip_cert_verify {
        proxy.insert(Value::from("skip-cert-verify"), Value::from(skip));
    }
    Some(proxy)
}

fn put(map: &mut Mapping, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        map.insert(Value::from(key), Value::from(value));
    }
}

fn transport(proxy: &mut Mapping, record: &ProxyRecord) {
    let Some(network) = record.network else {
        return;
    };
    put(proxy, "network", Some(network.as_token()));

    match network {
        Network::WebSocket => {
            let mut opts = Mapping::new();
            put(&mut opts, "path", record.path.as_deref());
            if let Some(host) = record.host_header.as_deref() {
                let mut headers = Mapping::new();
                put(&mut headers, "Host", Some(host));
                opts.insert(Value::from("headers"), Value::Mapping(headers));
            }
            proxy.insert(Value::from("ws-opts"), Value::Mapping(opts));
        }
        Network::Grpc => {
            let mut opts = Mapping::new();
            put(&mut opts, "grpc-service-name", record.service_name.as_deref());
            proxy.insert(Value::from("grpc-opts"), Value::Mapping(opts));
            put(proxy, "grpc-mode", record.grpc_mode.as_deref());
        }
        Network::Tcp => {}
    }
}
