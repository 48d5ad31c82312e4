//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 模拟 e2e 测试（MockTransport，无需 broker）
//! - 真实 DEALER -> ROUTER 回环测试

#[cfg(test)]
mod contract_tests {
    use contracts::{ErrorKind, ForwarderError};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
        assert_eq!(contracts::DEFAULT_SERVICE_NAME, "telegraf");
    }

    #[test]
    fn test_write_error_message_shape() {
        let err = ForwarderError::write(
            "cpu value=42",
            ForwarderError::WouldBlock {
                endpoint: "tcp://127.0.0.1:9999".to_string(),
            },
        );
        assert_eq!(err.kind(), ErrorKind::WouldBlock);
        assert!(err
            .to_string()
            .starts_with("failed to write message: cpu value=42, "));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ErrorKind, Metric, MetricSink};
    use zmq_output::mock::MockTransport;
    use zmq_output::{ShutdownList, SinkHandle, ZmqSink};

    const CONFIG: &str = r#"
version = "V1"

[[outputs]]
name = "zmqclient"
endpoint = "tcp://127.0.0.1:9999"
identity = "edge-01"

[[outputs]]
name = "graphite"
endpoint = "ipc:///tmp/forwarder-broker"
service = "carbon"
data_format = "graphite"
graphite_prefix = "lab"
"#;

    /// End-to-end test: ConfigLoader -> ZmqSink (mock transport) -> SinkHandle
    ///
    /// 验证完整的数据流：
    /// 1. 配置加载并应用默认值
    /// 2. 每个输出按配置序列化并封装四帧信封
    /// 3. 关闭清单在 worker 关闭后只报告已关闭
    #[tokio::test]
    async fn test_e2e_mock_outputs() {
        let config = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let shutdown = Arc::new(ShutdownList::new());

        let mut mocks = Vec::new();
        let mut handles = Vec::new();
        for output in &config.outputs {
            let mock = MockTransport::new();
            let mut sink = ZmqSink::from_config(
                output,
                mock.clone(),
                serializers::create_serializer(output),
                Arc::clone(&shutdown),
            );
            MetricSink::connect(&mut sink).await.unwrap();
            let metrics = Arc::clone(sink.metrics());
            handles.push(SinkHandle::spawn_with_metrics(sink, output.queue_capacity, metrics));
            mocks.push(mock);
        }
        assert_eq!(shutdown.len(), 2);

        let batch = vec![
            Metric::new("cpu")
                .with_tag("host", "edge-01")
                .with_field("value", 42i64)
                .with_timestamp(1_700_000_000_000_000_000),
            Metric::new("mem")
                .with_field("used", 0.5)
                .with_field("free", 0.25)
                .with_timestamp(1_700_000_000_000_000_000),
        ];
        for handle in &handles {
            assert!(handle.send(batch.clone()).await);
        }
        for handle in handles {
            handle.shutdown().await;
        }

        // Influx output: one envelope per metric
        let influx = mocks[0].envelopes();
        assert_eq!(influx.len(), 2);
        assert_eq!(influx[0][0], b"".to_vec());
        assert_eq!(influx[0][1], b"telegraf".to_vec());
        assert_eq!(influx[0][2], b"".to_vec());
        assert_eq!(
            influx[0][3],
            b"cpu,host=edge-01 value=42i 1700000000000000000\n".to_vec()
        );

        // Graphite output: one envelope per numeric field
        let graphite = mocks[1].envelopes();
        assert_eq!(graphite.len(), 3);
        assert!(graphite.iter().all(|e| e[1] == b"carbon".to_vec()));
        assert_eq!(graphite[0][3], b"lab.edge-01.cpu 42 1700000000\n".to_vec());

        // Workers closed their sessions; the sweep only finds released sockets
        let report = shutdown.close_all();
        assert_eq!(report.already_closed, 2);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn test_e2e_failure_isolated_per_output() {
        let config = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let shutdown = Arc::new(ShutdownList::new());

        let broken = MockTransport::new();
        broken.set_would_block(true);
        let healthy = MockTransport::new();

        let mut sinks = Vec::new();
        for (output, mock) in config.outputs.iter().zip([&broken, &healthy]) {
            let mut sink = ZmqSink::from_config(
                output,
                mock.clone(),
                serializers::create_serializer(output),
                Arc::clone(&shutdown),
            );
            sink.open_session().unwrap();
            sinks.push(sink);
        }

        let batch = [Metric::new("cpu").with_field("value", 1.0)];
        let err = sinks[0].write_batch(&batch).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WouldBlock);
        assert_eq!(sinks[1].write_batch(&batch).unwrap(), 1);

        assert_eq!(broken.envelopes().len(), 0);
        assert_eq!(healthy.envelopes().len(), 1);

        let report = shutdown.close_all();
        assert_eq!(report.closed, 2);
    }
}

#[cfg(test)]
mod loopback_tests {
    use std::sync::Arc;

    use contracts::{DataFormat, Endpoint, Metric, OutputConfig, ServiceName};
    use zmq_output::{host_identity, DefaultZmqSink, SessionState, ShutdownList};

    /// ROUTER bound to an ephemeral loopback port
    fn router() -> (zmq::Context, zmq::Socket, Endpoint) {
        let ctx = zmq::Context::new();
        let socket = ctx.socket(zmq::ROUTER).unwrap();
        socket.set_linger(0).unwrap();
        socket.set_rcvtimeo(5000).unwrap();
        socket.bind("tcp://127.0.0.1:*").unwrap();
        let endpoint = socket.get_last_endpoint().unwrap().unwrap();
        (ctx, socket, Endpoint::parse(&endpoint).unwrap())
    }

    fn output(endpoint: Endpoint) -> OutputConfig {
        OutputConfig {
            linger_ms: 0,
            ..OutputConfig::new("loopback", endpoint)
        }
    }

    #[test]
    fn test_router_sees_identity_and_envelope() {
        let (_ctx, router, endpoint) = router();
        let config = OutputConfig {
            identity: Some("edge-loop".to_string()),
            ..output(endpoint)
        };

        let mut sink = DefaultZmqSink::open(&config, Arc::new(ShutdownList::new())).unwrap();
        sink.open_session().unwrap();
        sink.write_batch(&[Metric::new("cpu")
            .with_field("value", 42i64)
            .with_timestamp(1_000_000_000)])
            .unwrap();

        let frames = router.recv_multipart(0).unwrap();
        assert_eq!(
            frames,
            vec![
                b"edge-loop".to_vec(),
                b"".to_vec(),
                b"telegraf".to_vec(),
                b"".to_vec(),
                b"cpu value=42i 1000000000\n".to_vec(),
            ]
        );

        sink.close_session().unwrap();
        assert_eq!(sink.session().state(), SessionState::Closed);
    }

    #[test]
    fn test_default_identity_is_host_name() {
        let (_ctx, router, endpoint) = router();
        let config = OutputConfig {
            service: ServiceName::new("metrics"),
            data_format: DataFormat::Json,
            ..output(endpoint)
        };

        let mut sink = DefaultZmqSink::open(&config, Arc::new(ShutdownList::new())).unwrap();
        sink.open_session().unwrap();
        sink.write_batch(&[Metric::new("up").with_field("value", true)])
            .unwrap();

        let frames = router.recv_multipart(0).unwrap();
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[0], host_identity().as_bytes().to_vec());
        assert_eq!(frames[2], b"metrics".to_vec());
        let payload = String::from_utf8(frames[4].clone()).unwrap();
        assert!(payload.contains("\"name\":\"up\""));
        assert!(frames[4].ends_with(b"\n"));
    }

    #[test]
    fn test_payloads_arrive_in_order() {
        let (_ctx, router, endpoint) = router();
        let mut sink =
            DefaultZmqSink::open(&output(endpoint), Arc::new(ShutdownList::new())).unwrap();
        sink.open_session().unwrap();

        let metrics: Vec<Metric> = (0..5)
            .map(|i| Metric::new(format!("m{i}")).with_field("value", i as i64))
            .collect();
        assert_eq!(sink.write_batch(&metrics).unwrap(), 5);

        for i in 0..5 {
            let frames = router.recv_multipart(0).unwrap();
            let expected = format!("m{i} value={i}i");
            assert!(frames[4].starts_with(expected.as_bytes()));
        }
    }

    #[test]
    fn test_shutdown_sweep_closes_real_sockets() {
        let (_ctx, _router, endpoint) = router();
        let shutdown = Arc::new(ShutdownList::new());

        let mut first = DefaultZmqSink::open(&output(endpoint.clone()), Arc::clone(&shutdown)).unwrap();
        let mut second = DefaultZmqSink::open(&output(endpoint), Arc::clone(&shutdown)).unwrap();
        first.open_session().unwrap();
        second.open_session().unwrap();

        first.close_session().unwrap();
        let report = shutdown.close_all();

        assert_eq!(report.closed, 1);
        assert_eq!(report.already_closed, 1);
        assert_eq!(second.session().state(), SessionState::Closed);
    }
}
