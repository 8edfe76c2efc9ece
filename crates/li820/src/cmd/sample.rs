use li820_sampler::DeviceSession;
use li820_transport::DeviceStream;
use tracing::debug;

use crate::cmd::SampleArgs;
use crate::exit::{session_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_measurements, OutputFormat};

pub fn run(args: SampleArgs, format: OutputFormat) -> CliResult<i32> {
    let device = &args.device;
    let config = device.session.session_config();
    let stream = DeviceStream::open(
        &device.device,
        &device.serial_settings(),
        config.frame_tag.as_str(),
    )
    .map_err(|err| transport_error("open device failed", err))?;

    let mut session = DeviceSession::with_frame_config(stream, config, device.frame_config());
    let mut records = Vec::new();
    for _ in 0..args.count {
        let record = session
            .sample()
            .map_err(|err| session_error("sampling failed", err))?;
        records.push(record);
    }

    let stream = session.close();
    debug!(device = %stream.address(), samples = records.len(), "closing device");
    drop(stream);

    print_measurements(&records, format);
    Ok(SUCCESS)
}
