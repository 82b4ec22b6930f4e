use crate::config::{InputConfig, OutputConfig, SubmitConfig};
use crate::errors::Result;
use crate::storage::{SasPermissions, SasSigner};
use crate::workflows::{
    NewWorkflow, NewWorkflowInputArgs, NewWorkflowOptionalArgs, NewWorkflowOutputArgs, StorageKind,
};
use chrono::{DateTime, Utc};

/// Build the submission body for `config`, signing storage grants at `now`.
///
/// The input blob gets a read-only grant signed with the input account's
/// key; the output container gets read/write/delete signed with the output
/// account's key. If either signature fails no payload is produced.
pub fn build_payload(config: &SubmitConfig, now: DateTime<Utc>) -> Result<NewWorkflow> {
    let blob_name_with_sas = input_blob_sas(&config.input, now)?;
    let container_sas = output_container_sas(&config.output, now)?;

    Ok(NewWorkflow {
        workflow_class: String::new(),
        process: config.process.name.clone(),
        process_args: config.process.args.clone(),
        description: config.description.clone(),
        input_storage_type: StorageKind::AzureBlockBlob,
        input_args: NewWorkflowInputArgs {
            account_name: config.input.storage.account_name().to_string(),
            container_name: config.input.storage.container_name.clone(),
            blob_names: config.input.blob_name.clone(),
            blob_names_with_sas: blob_name_with_sas,
        },
        output_storage_type: StorageKind::AzureBlockBlob,
        output_args: NewWorkflowOutputArgs {
            account_name: config.output.storage.account_name().to_string(),
            container_name: config.output.storage.container_name.clone(),
            container_sas,
            basename: config.output.basename.clone(),
            overwrite: config.output.overwrite,
            include_logfiles: config.output.include_log,
        },
        optional_args: NewWorkflowOptionalArgs {
            gatk_emit_ref_confidence: config.optional_args.emit_ref_confidence,
            bgzip_output: config.optional_args.bgzip_output,
        },
        ignore_azure_region: config.ignore_azure_region,
    })
}

/// `{blob}?{sas}` for the input blob
fn input_blob_sas(input: &InputConfig, now: DateTime<Utc>) -> Result<String> {
    let signer = SasSigner::new(input.storage.credential.clone());

    let sas = signer.blob_sas(
        &input.storage.container_name,
        &input.blob_name,
        SasPermissions::read_only(),
        now,
    )?;

    Ok(format!("{}?{}", input.blob_name, sas))
}

fn output_container_sas(output: &OutputConfig, now: DateTime<Utc>) -> Result<String> {
    let signer = SasSigner::new(output.storage.credential.clone());

    signer.container_sas(
        &output.storage.container_name,
        SasPermissions::read_write_delete(),
        now,
    )
}
