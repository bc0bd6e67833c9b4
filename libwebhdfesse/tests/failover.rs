/*
   Copyright 2021 Ivan Boldyrev

   Licensed under the Apache License, Version 2.0 (the "License");
   you may not use this file except in compliance with the License.
   You may obtain a copy of the License at

       http://www.apache.org/licenses/LICENSE-2.0

   Unless required by applicable law or agreed to in writing, software
   distributed under the License is distributed on an "AS IS" BASIS,
   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
   See the License for the specific language governing permissions and
   limitations under the License.
*/
mod common;

use std::error::Error;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use libwebhdfesse::config::{read_config_as_dict, RetryPolicy};
use libwebhdfesse::{ClientConfig, ErrorKind, Options, WebHdfs};

use common::{config, fast_retry, MockTransport, NAMENODE, ROOT_STATUS, STANDBY};

const JMX: &str = "jmx";
const ACTIVE: &str = r#"{"beans":[{"name":"Hadoop:service=NameNode,name=NameNodeStatus","State":"active","HostAndPort":"nn2:8020"}]}"#;

const DATA_STAT: &str = "/webhdfs/v1/data?op=GETFILESTATUS";
const ROOT_STAT: &str = "/webhdfs/v1/?op=GETFILESTATUS";

const NN1: &str = "nn1.example.com";
const NN2: &str = "nn2.example.com";
const HA_SITE: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>
<configuration>
  <property><name>dfs.nameservices</name><value>cluster</value></property>
  <property><name>dfs.ha.namenodes.cluster</name><value>nn1,nn2</value></property>
  <property><name>dfs.namenode.http-address.cluster.nn1</name><value>nn1.example.com:9870</value></property>
  <property><name>dfs.namenode.http-address.cluster.nn2</name><value>nn2.example.com:9870</value></property>
</configuration>";

fn status_bean(state: &str, host: &str) -> String {
    format!(
        r#"{{"beans":[{{"name":"Hadoop:service=NameNode,name=NameNodeStatus","State":"{}","HostAndPort":"{}:8020"}}]}}"#,
        state, host
    )
}

fn site_config() -> Result<ClientConfig, Box<dyn Error>> {
    let dict = read_config_as_dict(Cursor::new(HA_SITE), Path::new("hdfs-site.xml"))?;
    Ok(ClientConfig::from_dict(&dict, None)?.with_retry(fast_retry()))
}

fn ha_config() -> ClientConfig {
    config().with_jmx_host(format!("http://{}:50070", JMX))
}

#[test]
fn test_retry_bound() {
    for budget in 0..4u32 {
        let mock = MockTransport::new();
        mock.reply(NAMENODE, 500, &[], "");
        for _ in 0..budget {
            // Health check of the root, then the failing call again.
            mock.json(NAMENODE, 200, ROOT_STATUS)
                .reply(NAMENODE, 500, &[], "");
        }
        let client = WebHdfs::with_transport(
            config().with_retry(fast_retry().with_max_attempts(budget)),
            &mock,
        );

        let err = client.stat("/data").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Server);
        let calls = mock
            .requests()
            .iter()
            .filter(|req| req.path == DATA_STAT)
            .count();
        assert_eq!(calls, budget as usize + 1);
        assert_eq!(mock.requests().len(), 2 * budget as usize + 1);
        assert_eq!(mock.remaining(NAMENODE), 0);
    }
}

#[test]
fn test_connection_failure_is_retried() -> Result<(), Box<dyn Error>> {
    let mock = MockTransport::new();
    mock.json(JMX, 200, ACTIVE);
    mock.json("nn2", 200, ROOT_STATUS).json(
        "nn2",
        200,
        r#"{"FileStatuses":{"FileStatus":[{"pathSuffix":"a"}]}}"#,
    );
    let client = WebHdfs::with_transport(ha_config(), &mock);

    assert_eq!(client.list("/")?.len(), 1);
    assert_eq!(mock.hosts(), vec![NAMENODE, JMX, "nn2", "nn2"]);
    assert_eq!(client.host(), "nn2");
    Ok(())
}

#[test]
fn test_connection_failure_with_dead_namenode() {
    let mock = MockTransport::new();
    let client = WebHdfs::with_transport(config(), &mock);

    // The health check hits the same refused connection and ends the call.
    let err = client.list("/").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Server);
    assert_eq!(mock.requests().len(), 2);
    assert_eq!(mock.requests()[1].path, ROOT_STAT);
}

#[test]
fn test_retry_disabled() {
    let mock = MockTransport::new();
    mock.reply(NAMENODE, 500, &[], "").reply(NAMENODE, 500, &[], "");
    let client = WebHdfs::with_transport(config().with_retry(RetryPolicy::disabled()), &mock);

    assert!(client.stat("/").is_err());
    assert_eq!(mock.requests().len(), 1);
}

#[test]
fn test_standby_failover() -> Result<(), Box<dyn Error>> {
    let mock = MockTransport::new();
    mock.json(NAMENODE, 403, STANDBY);
    mock.json(JMX, 200, ACTIVE);
    mock.json("nn2", 200, ROOT_STATUS).json("nn2", 200, ROOT_STATUS);
    let client = WebHdfs::with_transport(ha_config(), &mock);
    assert_eq!(client.host(), NAMENODE);

    let status = client.stat("/")?;
    assert!(status.is_dir());
    assert_eq!(client.host(), "nn2");
    assert_eq!(mock.hosts(), vec![NAMENODE, JMX, "nn2", "nn2"]);

    let jmx = &mock.requests()[1];
    assert_eq!(jmx.port, 50070);
    assert_eq!(
        jmx.path,
        "/jmx?qry=Hadoop:service=NameNode,name=NameNodeStatus"
    );
    Ok(())
}

#[test]
fn test_standby_without_jmx_checks_health() -> Result<(), Box<dyn Error>> {
    let mock = MockTransport::new();
    mock.json(NAMENODE, 403, STANDBY)
        .json(NAMENODE, 200, ROOT_STATUS)
        .json(NAMENODE, 200, ROOT_STATUS);
    let client = WebHdfs::with_transport(config(), &mock);

    client.stat("/data")?;
    let paths: Vec<_> = mock.requests().into_iter().map(|req| req.path).collect();
    assert_eq!(paths, vec![DATA_STAT, ROOT_STAT, DATA_STAT]);
    assert_eq!(client.host(), NAMENODE);
    Ok(())
}

#[test]
fn test_failed_health_check_without_jmx_is_fatal() {
    let mock = MockTransport::new();
    mock.json(NAMENODE, 403, STANDBY)
        .reply(NAMENODE, 401, &[], "Authentication required")
        .json(NAMENODE, 200, ROOT_STATUS);
    let client = WebHdfs::with_transport(config(), &mock);

    let err = client.stat("/data").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Security);
    let paths: Vec<_> = mock.requests().into_iter().map(|req| req.path).collect();
    assert_eq!(paths, vec![DATA_STAT, ROOT_STAT]);
    assert_eq!(mock.remaining(NAMENODE), 1);
}

#[test]
fn test_block_length_retry_skips_discovery() -> Result<(), Box<dyn Error>> {
    let mock = MockTransport::new();
    mock.json(
        NAMENODE,
        403,
        r#"{"RemoteException":{"exception":"IOException","javaClassName":"java.io.IOException","message":"Cannot obtain block length for LocatedBlock{BP-1:blk_1}"}}"#,
    )
    .redirect(NAMENODE, "http://dn1:9864/webhdfs/v1/f?op=OPEN");
    mock.reply("dn1", 200, &[], "data");
    let client = WebHdfs::with_transport(ha_config(), &mock);

    assert_eq!(&client.read("/f", &Options::new())?[..], b"data");
    assert_eq!(mock.hosts(), vec![NAMENODE, NAMENODE, "dn1"]);
    Ok(())
}

#[test]
fn test_failed_health_check_is_fatal() {
    let mock = MockTransport::new();
    mock.reply(NAMENODE, 500, &[], "boom");
    mock.json(JMX, 200, ACTIVE);
    mock.reply("nn2", 401, &[], "Authentication required");
    let client = WebHdfs::with_transport(
        ha_config().with_retry(fast_retry().with_max_attempts(3)),
        &mock,
    );

    let err = client.stat("/").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Security);
    assert_eq!(mock.hosts(), vec![NAMENODE, JMX, "nn2"]);
}

#[test]
fn test_failed_discovery_keeps_host() -> Result<(), Box<dyn Error>> {
    let mock = MockTransport::new();
    mock.json(NAMENODE, 403, STANDBY)
        .json(NAMENODE, 200, ROOT_STATUS)
        .json(NAMENODE, 200, ROOT_STATUS);
    mock.reply(JMX, 500, &[], "");
    let client = WebHdfs::with_transport(ha_config(), &mock);

    client.stat("/")?;
    assert_eq!(client.host(), NAMENODE);
    assert_eq!(mock.hosts(), vec![NAMENODE, JMX, NAMENODE, NAMENODE]);
    Ok(())
}

#[test]
fn test_client_errors_not_retried() {
    let mock = MockTransport::new();
    mock.json(
        NAMENODE,
        400,
        r#"{"RemoteException":{"exception":"IllegalArgumentException","message":"Invalid value for webhdfs parameter"}}"#,
    );
    mock.reply(NAMENODE, 401, &[], "").reply(NAMENODE, 404, &[], "");
    let client = WebHdfs::with_transport(ha_config(), &mock);

    assert_eq!(client.stat("/").unwrap_err().kind(), ErrorKind::Client);
    assert_eq!(client.stat("/").unwrap_err().kind(), ErrorKind::Security);
    assert_eq!(client.stat("/").unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(mock.requests().len(), 3);
}

#[test]
fn test_unknown_status_not_retried() {
    let mock = MockTransport::new();
    mock.reply(NAMENODE, 503, &[], "").reply(NAMENODE, 503, &[], "");
    let client = WebHdfs::with_transport(config(), &mock);

    let err = client.stat("/").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestFailed);
    assert_eq!(
        err.failure().unwrap().message,
        "response code:503, message:Response body is empty..."
    );
    assert_eq!(mock.requests().len(), 1);
}

#[test]
fn test_streamed_payload_is_not_replayed() {
    let mock = MockTransport::new();
    mock.redirect(NAMENODE, "http://dn1:9864/big?op=CREATE")
        .json(NAMENODE, 200, ROOT_STATUS)
        .redirect(NAMENODE, "http://dn1:9864/big?op=CREATE");
    mock.reply("dn1", 500, &[], "").reply("dn1", 201, &[], "");
    let client = WebHdfs::with_transport(config(), &mock);

    let err = client
        .create_from_reader("/big", Cursor::new(b"stream".to_vec()), 6, &Options::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RequestFailed);
    assert!(err.to_string().contains("cannot be replayed"));
    assert_eq!(mock.hosts(), vec![NAMENODE, "dn1", NAMENODE, NAMENODE]);
}

#[test]
fn test_bytes_payload_is_replayed() -> Result<(), Box<dyn Error>> {
    let mock = MockTransport::new();
    mock.redirect(NAMENODE, "http://dn1:9864/f?op=CREATE")
        .json(NAMENODE, 200, ROOT_STATUS)
        .redirect(NAMENODE, "http://dn1:9864/f?op=CREATE");
    mock.reply("dn1", 500, &[], "").reply("dn1", 201, &[], "");
    let client = WebHdfs::with_transport(config(), &mock);

    assert!(client.create("/f", "hello", &Options::new())?);
    let requests = mock.requests();
    assert_eq!(requests[2].path, ROOT_STAT);
    assert_eq!(requests[1].body, b"hello");
    assert_eq!(requests[4].body, b"hello");
    Ok(())
}

#[test]
fn test_site_failover_and_back() -> Result<(), Box<dyn Error>> {
    let mock = MockTransport::new();
    mock.json(NN1, 403, STANDBY)
        .json(NN1, 200, &status_bean("standby", NN1))
        .json(NN1, 200, &status_bean("active", NN1))
        .json(NN1, 200, ROOT_STATUS)
        .json(NN1, 200, ROOT_STATUS);
    mock.json(NN2, 200, &status_bean("active", NN2))
        .json(NN2, 200, ROOT_STATUS)
        .json(NN2, 200, ROOT_STATUS)
        .json(NN2, 403, STANDBY);
    let client = WebHdfs::with_transport(site_config()?, &mock);
    assert_eq!(client.host(), NN1);

    client.stat("/data")?;
    assert_eq!(client.host(), NN2);
    client.stat("/data")?;
    assert_eq!(client.host(), NN1);

    assert_eq!(
        mock.hosts(),
        vec![NN1, NN1, NN2, NN2, NN2, NN2, NN1, NN1, NN1]
    );
    let requests = mock.requests();
    assert!(requests.iter().all(|req| req.port == 9870));
    for i in [1, 2, 6] {
        assert!(requests[i].path.starts_with("/jmx?qry="), "{}", requests[i].path);
    }
    assert_eq!(mock.remaining(NN1), 0);
    assert_eq!(mock.remaining(NN2), 0);
    Ok(())
}

#[test]
fn test_site_without_active_namenode() -> Result<(), Box<dyn Error>> {
    let mock = MockTransport::new();
    mock.json(NN1, 200, &status_bean("standby", NN1));
    mock.json(NN2, 500, "");
    let client = WebHdfs::with_transport(site_config()?, &mock);

    let err = client.discover_active_namenode().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::JmxUnavailable);
    assert_eq!(mock.hosts(), vec![NN1, NN2]);
    Ok(())
}

#[test]
fn test_manual_discovery() -> Result<(), Box<dyn Error>> {
    let mock = MockTransport::new();
    let client = WebHdfs::with_transport(config(), &mock);
    assert_eq!(
        client.discover_active_namenode().unwrap_err().kind(),
        ErrorKind::JmxUnavailable
    );
    client.refresh_from_discovery();
    assert_eq!(client.host(), NAMENODE);
    assert!(mock.requests().is_empty());

    mock.json(JMX, 200, ACTIVE);
    mock.json("nn2", 200, ROOT_STATUS);
    let client = WebHdfs::with_transport(ha_config(), &mock);
    assert_eq!(client.discover_active_namenode()?, "nn2");
    assert_eq!(client.host(), NAMENODE);
    client.set_host("nn2");
    assert!(client.is_operational());
    Ok(())
}

#[test]
fn test_shared_between_threads() -> Result<(), Box<dyn Error>> {
    let mock = Arc::new(MockTransport::new());
    for _ in 0..4 {
        mock.json(NAMENODE, 200, ROOT_STATUS);
    }
    let client = Arc::new(WebHdfs::with_transport(config(), mock.clone()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let client = client.clone();
            thread::spawn(move || client.stat("/").map(|status| status.owner))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap()?, "hdfs");
    }
    assert_eq!(mock.requests().len(), 4);
    Ok(())
}
