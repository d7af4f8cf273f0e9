//! Peer discovery script run by the `init-bootnode-ip` init container.
//!
//! Reads a comma-separated host list from `BOOTSTRAPPERS`, resolves each
//! name with up to three attempts ten seconds apart, and writes
//! `{"bootstrap-ips":"<ips>:9651"}` to `$CONFIG_PATH/conf.json`. Exits 1
//! when nothing resolves.

/// ConfigMap key holding the script.
pub const SCRIPT_KEY: &str = "config.sh";

pub const BOOTSTRAP_FINDER_SCRIPT: &str = r#"#!/bin/bash

echo "Config path: $CONFIG_PATH/conf.json"
echo "DNSs to resolve: $BOOTSTRAPPERS"

IFS=',' read -r -a bootstrappers_array <<< "$BOOTSTRAPPERS"

delim=""
joined_ip=""

for bootstrapper in "${bootstrappers_array[@]}"
do
	retry=3
	dig_out=''

	while [ -z "$dig_out" ] && [ "$retry" -ne "0" ]
	do
		if [ "$retry" -ne "3" ]; then
			sleep 10
		fi
		echo "Resolving $bootstrapper"
		dig_out=$(dig +search +short "$bootstrapper")
		retry=$((retry-1))
	done

	IFS=$'\n' read -r -d '' -a ips <<< "$dig_out"
	for ip in "${ips[@]}"
	do
		echo "Resolved $ip"
		joined_ip="$joined_ip$delim$ip"
		delim=","
	done
done

if [ -z "$joined_ip" ]; then
	echo "ERROR no DNS addresses have been resolved"
	exit 1
fi

echo "{\"bootstrap-ips\":\"${joined_ip}:9651\"}" > "$CONFIG_PATH/conf.json"
cat "$CONFIG_PATH/conf.json"
"#;
