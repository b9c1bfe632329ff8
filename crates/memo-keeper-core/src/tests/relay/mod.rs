mod remote_relay;
