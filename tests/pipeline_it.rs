#![cfg(feature = "reqwest")]

mod common;

// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use leadgen_broker::{
	error::{Error, TokenKind},
	export::ExportFormat,
	flow::{LeadPipeline, PipelineRequest},
	graph::LeadWindow,
	resolver::PinnedCredentials,
};

#[tokio::test]
async fn pipeline_exports_the_first_form_of_the_selected_page() {
	let server = MockServer::start_async().await;
	let (service, _) = common::service(&server, [common::account()], PinnedCredentials::default());
	let exchange = server
		.mock_async(|when, then| {
			when.method(GET).path("/oauth/access_token");
			then.status(200).json_body(json!({ "access_token": "exchanged-long" }));
		})
		.await;
	let pages = server
		.mock_async(|when, then| {
			when.method(GET).path("/v19.0/me/accounts").query_param("access_token", "exchanged-long");
			then.status(200)
				.json_body(common::pages_body(&[("101", "fresh-101"), ("202", "fresh-202")]));
		})
		.await;
	let forms = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/v18.0/202/leadgen_forms")
				.query_param("access_token", "fresh-202");
			then.status(200).json_body(json!({
				"data": [{ "id": "900", "name": "Signup" }, { "id": "901", "name": "Quote" }],
			}));
		})
		.await;
	let leads = server
		.mock_async(|when, then| {
			when.method(GET).path("/900/leads").query_param("access_token", "fresh-202");
			then.status(200).json_body(json!({
				"data": [{ "id": "l1", "created_time": "2025-03-09T10:00:00+0000", "field_data": [] }],
			}));
		})
		.await;
	let report = LeadPipeline::new(&service)
		.run(PipelineRequest {
			page_id: Some("202".into()),
			format: ExportFormat::Json,
			..Default::default()
		})
		.await
		.expect("Pipeline should succeed.");

	exchange.assert_async().await;
	pages.assert_async().await;
	forms.assert_async().await;
	leads.assert_async().await;

	assert!(report.converted);
	assert_eq!(report.page.page_id.as_str(), "202");
	assert_eq!(report.form.id.as_str(), "900");
	assert_eq!(report.forms.forms.len(), 2);
	assert_eq!(report.export.filename, "leads_900_all.json");
	assert_eq!(report.export.lead_count, 1);
}

#[tokio::test]
async fn pipeline_reuses_stored_token_and_honors_requested_form() {
	let server = MockServer::start_async().await;
	let (service, _) = common::service(&server, [common::account()], PinnedCredentials::default());

	server
		.mock_async(|when, then| {
			when.method(GET).path("/v19.0/me/accounts").query_param("access_token", "stored-long");
			then.status(200).json_body(common::pages_body(&[("101", "fresh-101")]));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v18.0/101/leadgen_forms");
			then.status(200).json_body(json!({
				"data": [{ "id": "900", "name": "Signup" }, { "id": "901", "name": "Quote" }],
			}));
		})
		.await;

	let leads = server
		.mock_async(|when, then| {
			when.method(GET).path("/901/leads");
			then.status(200).json_body(json!({ "data": [] }));
		})
		.await;
	let report = LeadPipeline::new(&service)
		.run(PipelineRequest {
			skip_convert: true,
			form_id: Some(common::form_id("901")),
			window: LeadWindow::Yesterday,
			..Default::default()
		})
		.await
		.expect("Pipeline should succeed.");

	leads.assert_async().await;

	assert!(!report.converted);
	assert_eq!(report.form.name, "Quote");
	assert_eq!(report.export.filename, "leads_901_yesterday.csv");
	assert_eq!(report.export.body, b"ID,Created Time,Full Name,Email,Phone Number\n");
}

#[tokio::test]
async fn pipeline_stops_when_requested_form_is_missing() {
	let server = MockServer::start_async().await;
	let (service, _) = common::service(&server, [common::account()], PinnedCredentials::default());

	server
		.mock_async(|when, then| {
			when.method(GET).path("/v19.0/me/accounts");
			then.status(200).json_body(common::pages_body(&[("101", "fresh-101")]));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/v18.0/101/leadgen_forms");
			then.status(200).json_body(json!({ "data": [{ "id": "900", "name": "Signup" }] }));
		})
		.await;

	let err = LeadPipeline::new(&service)
		.run(PipelineRequest {
			skip_convert: true,
			form_id: Some(common::form_id("555")),
			..Default::default()
		})
		.await
		.expect_err("Unknown forms should stop the pipeline.");

	assert!(matches!(err, Error::FormNotFound { ref form_id } if form_id == "555"));
}

#[tokio::test]
async fn skipping_conversion_requires_a_stored_token() {
	let server = MockServer::start_async().await;
	let (service, _) = common::service(&server, [], PinnedCredentials::default());
	let err = LeadPipeline::new(&service)
		.run(PipelineRequest { skip_convert: true, ..Default::default() })
		.await
		.expect_err("No stored token should stop the pipeline.");

	assert!(matches!(err, Error::MissingToken { kind: TokenKind::LongLived }));
}
